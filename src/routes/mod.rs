/// Application routes configuration
use crate::handlers::{
    analysis_history, analysis_latest, analysis_start, analysis_stop, analyze_now, capture_info,
    capture_latest_image, capture_now, capture_start, capture_stop, get_analysis_config,
    get_capture_config, health, latest_redirect, update_analysis_config, update_capture_config,
    AppState,
};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        .route("/latest.jpg", get(latest_redirect))
        // Capture endpoints
        .route("/capture/latest.jpg", get(capture_latest_image))
        .route("/capture/info", get(capture_info))
        .route("/capture/now", get(capture_now))
        .route("/capture/start", get(capture_start))
        .route("/capture/stop", get(capture_stop))
        .route(
            "/capture/config",
            get(get_capture_config).post(update_capture_config),
        )
        // Analysis endpoints
        .route("/analysis/latest", get(analysis_latest))
        .route("/analysis/history", get(analysis_history))
        .route("/analysis/analyze", get(analyze_now))
        .route("/analysis/start", get(analysis_start))
        .route("/analysis/stop", get(analysis_stop))
        .route(
            "/analysis/config",
            get(get_analysis_config).post(update_analysis_config),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InferenceClient;
    use crate::domain::{AnalysisConfig, CaptureConfig, WeatherReport};
    use crate::errors::{ApiError, ApiResult};
    use crate::repo::{AnalysisRepo, CaptureRepo};
    use crate::scheduler::Scheduler;
    use crate::services::{AnalysisService, CaptureService};
    use crate::test_support::{sample_jpeg, serve, ScriptedSource};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::path::Path;
    use std::sync::Arc;

    struct Unreachable;

    #[async_trait]
    impl InferenceClient for Unreachable {
        async fn analyze(
            &self,
            _image: &[u8],
            _config: &AnalysisConfig,
        ) -> ApiResult<WeatherReport> {
            Err(ApiError::MissingCredential("ANTHROPIC_API_KEY"))
        }
    }

    fn state(save_dir: &Path, frames: Vec<ApiResult<Vec<u8>>>) -> AppState {
        let capture = CaptureService::new(
            CaptureRepo::new(CaptureConfig {
                source_url: "frames/source.jpg".to_string(),
                save_dir: save_dir.to_path_buf(),
                interval_secs: 60,
                timeout_secs: 5,
                width: 64,
                height: 48,
                quality: 85,
                running: false,
            }),
            Arc::new(ScriptedSource::new(frames)),
        );
        let analysis = AnalysisService::new(
            AnalysisRepo::new(AnalysisConfig {
                image_url: "frames/latest.jpg".to_string(),
                api_url: "http://localhost/v1/messages".to_string(),
                model: "test-model".to_string(),
                max_tokens: 100,
                temperature: 0.2,
                interval_secs: 300,
                timeout_secs: 5,
                history_capacity: 20,
                running: false,
            }),
            Arc::new(ScriptedSource::new(vec![Ok(sample_jpeg(8, 8))])),
            Arc::new(Unreachable),
        );
        AppState {
            capture: Arc::new(Scheduler::new(capture)),
            analysis: Arc::new(Scheduler::new(analysis)),
        }
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_state_reports_not_found_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(build_router(state(dir.path(), vec![]))).await;
        let http = client();

        let info = http.get(format!("{}/capture/info", base)).send().await.unwrap();
        assert_eq!(info.status(), 404);
        let body: Value = info.json().await.unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let latest = http.get(format!("{}/analysis/latest", base)).send().await.unwrap();
        assert_eq!(latest.status(), 404);
        let history = http.get(format!("{}/analysis/history", base)).send().await.unwrap();
        assert_eq!(history.status(), 404);

        let image = http.get(format!("{}/capture/latest.jpg", base)).send().await.unwrap();
        assert_eq!(image.status(), 200);
        assert_eq!(image.headers()["content-type"], "image/jpeg");
        let bytes = image.bytes().await.unwrap();
        let placeholder = image::load_from_memory(&bytes).unwrap();
        assert_eq!((placeholder.width(), placeholder.height()), (64, 48));

        let redirect = http.get(format!("{}/latest.jpg", base)).send().await.unwrap();
        assert_eq!(redirect.status(), 307);
        assert_eq!(redirect.headers()["location"], "/capture/latest.jpg");
    }

    #[tokio::test]
    async fn test_capture_now_then_info() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(build_router(state(dir.path(), vec![Ok(sample_jpeg(80, 60))]))).await;
        let http = client();

        let captured: Value = http
            .get(format!("{}/capture/now", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(captured["ok"], true);
        assert_eq!(captured["width"], 64);

        let info: Value = http
            .get(format!("{}/capture/info", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(info["status"], "ok");
        assert_eq!(info["frame"]["size_bytes"], captured["size_bytes"]);
    }

    #[tokio::test]
    async fn test_failed_analysis_is_reported_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(build_router(state(dir.path(), vec![]))).await;
        let http = client();

        let resp = http.get(format!("{}/analysis/analyze", base)).send().await.unwrap();
        assert_eq!(resp.status(), 503);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "MISSING_CREDENTIAL");

        let history: Value = http
            .get(format!("{}/analysis/history?limit=5", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(history["count"], 1);
        let health: Value = http
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["analysis"]["status"], "error");
        assert_eq!(health["capture"]["status"], "initializing");
    }

    #[tokio::test]
    async fn test_config_update_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(build_router(state(dir.path(), vec![]))).await;
        let http = client();

        let updated: Value = http
            .post(format!("{}/capture/config", base))
            .json(&json!({ "interval_secs": 15, "unknown": "ignored" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(updated["config"]["interval_secs"], 15);

        let rejected = http
            .post(format!("{}/analysis/config", base))
            .json(&json!({ "temperature": 3.0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), 400);

        let current: Value = http
            .get(format!("{}/analysis/config", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!((current["config"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_start_twice_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        let base = serve(build_router(state(dir.path(), vec![]))).await;
        let http = client();

        let first: Value = http
            .get(format!("{}/analysis/start", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first["result"], "started");

        let second: Value = http
            .get(format!("{}/analysis/start", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(second["result"], "already_running");

        let stopped: Value = http
            .get(format!("{}/analysis/stop", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stopped["result"], "stopped");
        assert_eq!(stopped["running"], false);
    }
}
