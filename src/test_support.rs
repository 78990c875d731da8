/// Shared fixtures for unit tests
use crate::clients::FrameSource;
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use axum::Router;
use image::{codecs::jpeg::JpegEncoder, Rgb, RgbImage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Encode a small solid-colour JPEG
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 140, 200]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 80)
        .encode_image(&img)
        .unwrap();
    buf
}

/// Serve a router on an ephemeral local port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

/// Frame source replaying a fixed script of outcomes
pub struct ScriptedSource {
    script: Mutex<VecDeque<ApiResult<Vec<u8>>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<ApiResult<Vec<u8>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn acquire(&self, _locator: &str, _timeout: Duration) -> ApiResult<Vec<u8>> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::SourceUnavailable("script exhausted".into())))
    }
}
