/// Weather analysis: acquire the current frame, run inference, record an observation
use crate::clients::{FrameSource, InferenceClient};
use crate::domain::{Observation, Status};
use crate::errors::{ApiError, ApiResult};
use crate::repo::AnalysisRepo;
use crate::scheduler::PollJob;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Outcome of one analysis attempt.
///
/// The observation is always recorded; `failure` keeps the typed error for
/// on-demand callers.
pub struct AnalysisRun {
    pub observation: Observation,
    pub failure: Option<ApiError>,
}

impl AnalysisRun {
    pub fn into_result(self) -> ApiResult<Observation> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.observation),
        }
    }
}

pub struct AnalysisService {
    repo: AnalysisRepo,
    source: Arc<dyn FrameSource>,
    client: Arc<dyn InferenceClient>,
    turn: Mutex<()>,
}

impl AnalysisService {
    pub fn new(
        repo: AnalysisRepo,
        source: Arc<dyn FrameSource>,
        client: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            repo,
            source,
            client,
            turn: Mutex::new(()),
        }
    }

    pub fn repo(&self) -> &AnalysisRepo {
        &self.repo
    }

    /// Run one full analysis and record its observation, success or not
    pub async fn analyze_once(&self) -> AnalysisRun {
        let _turn = self.turn.lock().await;
        let timestamp = Utc::now();
        let config = self.repo.get_config();
        let started = Instant::now();

        let image = match self.source.acquire(&config.image_url, config.timeout()).await {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    code = e.code(),
                    error = %e,
                    locator = %config.image_url,
                    "Analysis input unavailable"
                );
                let observation =
                    Observation::failed(timestamp, format!("Could not acquire image: {}", e));
                return self.record(observation, Status::Error, Some(e));
            }
        };

        match self.client.analyze(&image, &config).await {
            Ok(report) => {
                info!(
                    cloud_coverage = report.cloud_coverage,
                    cloud_type = %report.cloud_type,
                    confidence = report.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Weather analysis complete"
                );
                self.record(Observation::from_report(timestamp, report), Status::Ok, None)
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "Weather analysis failed");
                let observation = Observation::failed(timestamp, format!("Analysis failed: {}", e));
                self.record(observation, Status::Error, Some(e))
            }
        }
    }

    fn record(
        &self,
        observation: Observation,
        status: Status,
        failure: Option<ApiError>,
    ) -> AnalysisRun {
        self.repo.set_latest_observation(observation.clone());
        self.repo.set_status(status);
        AnalysisRun {
            observation,
            failure,
        }
    }
}

#[async_trait]
impl PollJob for AnalysisService {
    fn name(&self) -> &'static str {
        "analysis"
    }

    fn is_running(&self) -> bool {
        self.repo.get_config().running
    }

    fn set_running(&self, running: bool) {
        self.repo.set_running(running);
    }

    fn interval(&self) -> Duration {
        self.repo.get_config().interval()
    }

    async fn tick(&self) {
        self.analyze_once().await;
    }
}
