/// Domain models for the application
use crate::errors::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Coarse health of one scheduler, driven by the outcome of its latest attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Initializing,
    Ok,
    Error,
}

/// Capture scheduler configuration
#[derive(Debug, Clone, Serialize)]
pub struct CaptureConfig {
    pub source_url: String,
    pub save_dir: PathBuf,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    /// Output width; 0 keeps the source size
    pub width: u32,
    /// Output height; 0 keeps the source size
    pub height: u32,
    pub quality: u8,
    pub running: bool,
}

/// Partial capture configuration update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct CaptureConfigUpdate {
    pub source_url: Option<String>,
    pub save_dir: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Apply an update, rejecting it as a whole if any field is out of range
    pub fn apply(&mut self, update: CaptureConfigUpdate) -> ApiResult<()> {
        let mut next = self.clone();
        if let Some(v) = update.source_url {
            next.source_url = v;
        }
        if let Some(v) = update.save_dir {
            next.save_dir = v;
        }
        if let Some(v) = update.interval_secs {
            next.interval_secs = v;
        }
        if let Some(v) = update.timeout_secs {
            next.timeout_secs = v;
        }
        if let Some(v) = update.width {
            next.width = v;
        }
        if let Some(v) = update.height {
            next.height = v;
        }
        if let Some(v) = update.quality {
            next.quality = v;
        }

        if next.source_url.trim().is_empty() {
            return Err(ApiError::InvalidInput("source_url must not be empty".into()));
        }
        if next.interval_secs == 0 {
            return Err(ApiError::InvalidInput("interval_secs must be > 0".into()));
        }
        if next.timeout_secs == 0 {
            return Err(ApiError::InvalidInput("timeout_secs must be > 0".into()));
        }
        if !(1..=100).contains(&next.quality) {
            return Err(ApiError::InvalidInput("quality must be within 1..=100".into()));
        }

        *self = next;
        Ok(())
    }
}

/// Analysis scheduler configuration
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    pub image_url: String,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub history_capacity: usize,
    pub running: bool,
}

/// Partial analysis configuration update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisConfigUpdate {
    pub image_url: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub interval_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub history_capacity: Option<usize>,
}

impl AnalysisConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Apply an update, rejecting it as a whole if any field is out of range
    pub fn apply(&mut self, update: AnalysisConfigUpdate) -> ApiResult<()> {
        let mut next = self.clone();
        if let Some(v) = update.image_url {
            next.image_url = v;
        }
        if let Some(v) = update.api_url {
            next.api_url = v;
        }
        if let Some(v) = update.model {
            next.model = v;
        }
        if let Some(v) = update.max_tokens {
            next.max_tokens = v;
        }
        if let Some(v) = update.temperature {
            next.temperature = v;
        }
        if let Some(v) = update.interval_secs {
            next.interval_secs = v;
        }
        if let Some(v) = update.timeout_secs {
            next.timeout_secs = v;
        }
        if let Some(v) = update.history_capacity {
            next.history_capacity = v;
        }

        if next.image_url.trim().is_empty() {
            return Err(ApiError::InvalidInput("image_url must not be empty".into()));
        }
        if next.model.trim().is_empty() {
            return Err(ApiError::InvalidInput("model must not be empty".into()));
        }
        if next.max_tokens == 0 {
            return Err(ApiError::InvalidInput("max_tokens must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&next.temperature) {
            return Err(ApiError::InvalidInput("temperature must be within 0..=1".into()));
        }
        if next.interval_secs == 0 {
            return Err(ApiError::InvalidInput("interval_secs must be > 0".into()));
        }
        if next.timeout_secs == 0 {
            return Err(ApiError::InvalidInput("timeout_secs must be > 0".into()));
        }
        if next.history_capacity == 0 {
            return Err(ApiError::InvalidInput("history_capacity must be > 0".into()));
        }

        *self = next;
        Ok(())
    }
}

/// A persisted still frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub timestamp: DateTime<Utc>,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub size_bytes: usize,
}

/// Structured result extracted from an inference response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub cloud_coverage: f64,
    pub cloud_type: String,
    pub visibility: String,
    pub weather_conditions: String,
    pub confidence: f64,
    /// End-to-end latency of the inference call, seconds
    pub analysis_time: f64,
    /// Full text block the report was extracted from
    pub full_analysis: String,
    pub raw: Value,
}

/// One weather inference derived from a single frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub cloud_coverage: f64,
    pub cloud_type: String,
    pub visibility: String,
    pub weather_conditions: String,
    pub confidence: f64,
    pub analysis_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

impl Observation {
    pub fn from_report(timestamp: DateTime<Utc>, report: WeatherReport) -> Self {
        Self {
            timestamp,
            cloud_coverage: report.cloud_coverage,
            cloud_type: report.cloud_type,
            visibility: report.visibility,
            weather_conditions: report.weather_conditions,
            confidence: report.confidence,
            analysis_time: report.analysis_time,
            full_analysis: Some(report.full_analysis),
            raw_response: Some(report.raw),
        }
    }

    /// Observation recording a failed attempt; the description carries the diagnostic
    pub fn failed(timestamp: DateTime<Utc>, description: String) -> Self {
        Self {
            timestamp,
            cloud_coverage: 0.0,
            cloud_type: String::new(),
            visibility: String::new(),
            weather_conditions: description,
            confidence: 0.0,
            analysis_time: 0.0,
            full_analysis: None,
            raw_response: None,
        }
    }
}

/// Liveness and health of one scheduler
#[derive(Debug, Serialize)]
pub struct SchedulerHealth {
    pub status: Status,
    pub running: bool,
    pub alive: bool,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
    pub capture: SchedulerHealth,
    pub analysis: SchedulerHealth,
}
