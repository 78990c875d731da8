/// HTTP request handlers
use crate::domain::{
    AnalysisConfig, AnalysisConfigUpdate, CaptureConfig, CaptureConfigUpdate, FrameRecord,
    Health, Observation, SchedulerHealth, Status,
};
use crate::errors::ApiError;
use crate::scheduler::{PollJob, Scheduler, StartOutcome};
use crate::services::{placeholder_jpeg, AnalysisService, CaptureService};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_HISTORY_LIMIT: i64 = 10;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub capture: Arc<Scheduler<CaptureService>>,
    pub analysis: Arc<Scheduler<AnalysisService>>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

fn scheduler_health<J: PollJob>(scheduler: &Scheduler<J>, status: Status) -> SchedulerHealth {
    SchedulerHealth {
        status,
        running: scheduler.job().is_running(),
        alive: scheduler.is_alive(),
    }
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
        capture: scheduler_health(&state.capture, state.capture.job().repo().status()),
        analysis: scheduler_health(&state.analysis, state.analysis.job().repo().status()),
    })
}

pub async fn latest_redirect() -> Redirect {
    Redirect::temporary("/capture/latest.jpg")
}

// =============================================================================
// Capture
// =============================================================================

/// Latest frame bytes, or a placeholder before the first capture
pub async fn capture_latest_image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let service = state.capture.job();
    let body = match service.latest_frame_bytes().await? {
        Some(data) => data,
        None => {
            let config = service.repo().get_config();
            placeholder_jpeg(config.width, config.height)?
        }
    };
    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
        .into_response())
}

#[derive(Serialize)]
pub struct CaptureInfo {
    pub frame: FrameRecord,
    pub status: Status,
    pub source_url: String,
    pub interval_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub async fn capture_info(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<CaptureInfo>>, ApiError> {
    let repo = state.capture.job().repo();
    let frame = repo
        .latest_frame()
        .ok_or_else(|| ApiError::NotFound("no frame captured yet".to_string()))?;
    let config = repo.get_config();

    Ok(Json(SuccessResponse::new(CaptureInfo {
        frame,
        status: repo.status(),
        source_url: config.source_url,
        interval_secs: config.interval_secs,
        last_error: repo.last_error(),
    })))
}

/// Single-shot capture through the same path as the timer loop
pub async fn capture_now(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<FrameRecord>>, ApiError> {
    let record = state.capture.job().capture_once().await?;
    Ok(Json(SuccessResponse::new(record)))
}

#[derive(Serialize)]
pub struct LifecycleResponse {
    pub result: &'static str,
    pub running: bool,
}

fn start_response(outcome: StartOutcome) -> LifecycleResponse {
    LifecycleResponse {
        result: match outcome {
            StartOutcome::Started => "started",
            StartOutcome::AlreadyRunning => "already_running",
        },
        running: true,
    }
}

fn stop_response() -> LifecycleResponse {
    LifecycleResponse {
        result: "stopped",
        running: false,
    }
}

pub async fn capture_start(
    State(state): State<AppState>,
) -> Json<SuccessResponse<LifecycleResponse>> {
    Json(SuccessResponse::new(start_response(state.capture.start())))
}

pub async fn capture_stop(
    State(state): State<AppState>,
) -> Json<SuccessResponse<LifecycleResponse>> {
    state.capture.stop();
    Json(SuccessResponse::new(stop_response()))
}

#[derive(Serialize)]
pub struct ConfigResponse<T: Serialize> {
    pub config: T,
}

pub async fn get_capture_config(
    State(state): State<AppState>,
) -> Json<SuccessResponse<ConfigResponse<CaptureConfig>>> {
    let config = state.capture.job().repo().get_config();
    Json(SuccessResponse::new(ConfigResponse { config }))
}

pub async fn update_capture_config(
    State(state): State<AppState>,
    Json(update): Json<CaptureConfigUpdate>,
) -> Result<Json<SuccessResponse<ConfigResponse<CaptureConfig>>>, ApiError> {
    let config = state.capture.job().repo().update_config(update)?;
    tracing::info!(
        interval_secs = config.interval_secs,
        source = %config.source_url,
        "Capture config updated"
    );
    Ok(Json(SuccessResponse::new(ConfigResponse { config })))
}

// =============================================================================
// Analysis
// =============================================================================

pub async fn analysis_latest(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Observation>>, ApiError> {
    let observation = state
        .analysis
        .job()
        .repo()
        .latest_observation()
        .ok_or_else(|| ApiError::NotFound("no analysis available yet".to_string()))?;
    Ok(Json(SuccessResponse::new(observation)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}

pub async fn analysis_history(
    Query(params): Query<HistoryParams>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let items = state.analysis.job().repo().get_history(Some(limit));
    if items.is_empty() {
        return Err(ApiError::NotFound("no analysis history".to_string()));
    }

    Ok(Json(serde_json::json!(SuccessResponse::new(
        serde_json::json!({
            "count": items.len(),
            "items": items
        })
    ))))
}

/// Single-shot analysis; the observation is recorded even when this returns an error
pub async fn analyze_now(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Observation>>, ApiError> {
    let observation = state.analysis.job().analyze_once().await.into_result()?;
    Ok(Json(SuccessResponse::new(observation)))
}

pub async fn analysis_start(
    State(state): State<AppState>,
) -> Json<SuccessResponse<LifecycleResponse>> {
    Json(SuccessResponse::new(start_response(state.analysis.start())))
}

pub async fn analysis_stop(
    State(state): State<AppState>,
) -> Json<SuccessResponse<LifecycleResponse>> {
    state.analysis.stop();
    Json(SuccessResponse::new(stop_response()))
}

pub async fn get_analysis_config(
    State(state): State<AppState>,
) -> Json<SuccessResponse<ConfigResponse<AnalysisConfig>>> {
    let config = state.analysis.job().repo().get_config();
    Json(SuccessResponse::new(ConfigResponse { config }))
}

pub async fn update_analysis_config(
    State(state): State<AppState>,
    Json(update): Json<AnalysisConfigUpdate>,
) -> Result<Json<SuccessResponse<ConfigResponse<AnalysisConfig>>>, ApiError> {
    let config = state.analysis.job().repo().update_config(update)?;
    tracing::info!(
        interval_secs = config.interval_secs,
        model = %config.model,
        "Analysis config updated"
    );
    Ok(Json(SuccessResponse::new(ConfigResponse { config })))
}
