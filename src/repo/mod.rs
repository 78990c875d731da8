/// In-memory state stores shared between the schedulers and the HTTP layer
///
/// Every accessor copies in or out under a short `RwLock` critical section; no lock
/// is ever held across an `.await`.
use crate::domain::{
    AnalysisConfig, AnalysisConfigUpdate, CaptureConfig, CaptureConfigUpdate, FrameRecord,
    Observation, Status,
};
use crate::errors::ApiResult;
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

struct CaptureState {
    config: CaptureConfig,
    status: Status,
    latest_frame: Option<FrameRecord>,
    last_error: Option<String>,
}

/// Capture scheduler state
#[derive(Clone)]
pub struct CaptureRepo {
    state: Arc<RwLock<CaptureState>>,
}

impl CaptureRepo {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(CaptureState {
                config,
                status: Status::Initializing,
                latest_frame: None,
                last_error: None,
            })),
        }
    }

    /// Consistent snapshot of the current configuration
    pub fn get_config(&self) -> CaptureConfig {
        read(&self.state).config.clone()
    }

    pub fn update_config(&self, update: CaptureConfigUpdate) -> ApiResult<CaptureConfig> {
        let mut state = write(&self.state);
        state.config.apply(update)?;
        Ok(state.config.clone())
    }

    pub fn set_running(&self, running: bool) {
        write(&self.state).config.running = running;
    }

    pub fn status(&self) -> Status {
        read(&self.state).status
    }

    pub fn set_status(&self, status: Status) {
        write(&self.state).status = status;
    }

    pub fn latest_frame(&self) -> Option<FrameRecord> {
        read(&self.state).latest_frame.clone()
    }

    pub fn set_latest_frame(&self, record: FrameRecord) {
        let mut state = write(&self.state);
        state.latest_frame = Some(record);
        state.last_error = None;
    }

    /// Diagnostic of the most recent failed attempt, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        read(&self.state).last_error.clone()
    }

    /// Mark the latest attempt failed; the stored frame is left untouched
    pub fn record_failure(&self, diagnostic: String) {
        let mut state = write(&self.state);
        state.status = Status::Error;
        state.last_error = Some(diagnostic);
    }
}

struct AnalysisState {
    config: AnalysisConfig,
    status: Status,
    latest: Option<Observation>,
    history: VecDeque<Observation>,
}

impl AnalysisState {
    fn trim_history(&mut self) {
        while self.history.len() > self.config.history_capacity {
            self.history.pop_front();
        }
    }
}

/// Analysis scheduler state with a bounded observation history
#[derive(Clone)]
pub struct AnalysisRepo {
    state: Arc<RwLock<AnalysisState>>,
}

impl AnalysisRepo {
    pub fn new(config: AnalysisConfig) -> Self {
        let capacity = config.history_capacity;
        Self {
            state: Arc::new(RwLock::new(AnalysisState {
                config,
                status: Status::Initializing,
                latest: None,
                history: VecDeque::with_capacity(capacity),
            })),
        }
    }

    /// Consistent snapshot of the current configuration
    pub fn get_config(&self) -> AnalysisConfig {
        read(&self.state).config.clone()
    }

    /// Apply a partial update; shrinking the capacity evicts the oldest entries at once
    pub fn update_config(&self, update: AnalysisConfigUpdate) -> ApiResult<AnalysisConfig> {
        let mut state = write(&self.state);
        state.config.apply(update)?;
        state.trim_history();
        Ok(state.config.clone())
    }

    pub fn set_running(&self, running: bool) {
        write(&self.state).config.running = running;
    }

    pub fn status(&self) -> Status {
        read(&self.state).status
    }

    pub fn set_status(&self, status: Status) {
        write(&self.state).status = status;
    }

    pub fn latest_observation(&self) -> Option<Observation> {
        read(&self.state).latest.clone()
    }

    /// Record an observation as latest and append it to the history
    pub fn set_latest_observation(&self, observation: Observation) {
        let mut state = write(&self.state);
        state.history.push_back(observation.clone());
        state.latest = Some(observation);
        state.trim_history();
    }

    /// History in insertion order (oldest first).
    /// `None` or a non-positive limit returns everything, otherwise the last `limit` entries.
    pub fn get_history(&self, limit: Option<i64>) -> Vec<Observation> {
        let state = read(&self.state);
        let len = state.history.len();
        let skip = match limit {
            Some(n) if n > 0 => len.saturating_sub(n as usize),
            _ => 0,
        };
        state.history.iter().skip(skip).cloned().collect()
    }
}
