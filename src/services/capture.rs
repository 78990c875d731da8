/// Frame capture: acquire, re-encode, persist, record
use crate::clients::FrameSource;
use crate::domain::{CaptureConfig, FrameRecord, Status};
use crate::errors::ApiResult;
use crate::repo::CaptureRepo;
use crate::scheduler::PollJob;
use crate::utils::frame_file_name;
use async_trait::async_trait;
use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const LATEST_FRAME: &str = "latest.jpg";

/// Frame capture service
pub struct CaptureService {
    repo: CaptureRepo,
    source: Arc<dyn FrameSource>,
    /// Serializes timer-driven and on-demand captures
    turn: Mutex<()>,
}

impl CaptureService {
    pub fn new(repo: CaptureRepo, source: Arc<dyn FrameSource>) -> Self {
        Self {
            repo,
            source,
            turn: Mutex::new(()),
        }
    }

    pub fn repo(&self) -> &CaptureRepo {
        &self.repo
    }

    /// Acquire one frame and persist it.
    ///
    /// Shared by the timer loop and on-demand captures. On failure the status flips to
    /// `error` and any previously stored frame stays in place.
    pub async fn capture_once(&self) -> ApiResult<FrameRecord> {
        let _turn = self.turn.lock().await;
        let config = self.repo.get_config();
        let started = Instant::now();

        let outcome = match self.source.acquire(&config.source_url, config.timeout()).await {
            Ok(data) => persist_frame(&config, data).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(record) => {
                tracing::info!(
                    path = %record.path.display(),
                    size = record.size_bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Frame captured"
                );
                self.repo.set_latest_frame(record.clone());
                self.repo.set_status(Status::Ok);
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(
                    code = e.code(),
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Frame capture failed"
                );
                self.repo.record_failure(e.to_string());
                Err(e)
            }
        }
    }

    /// Bytes of the latest persisted frame, if one exists on disk
    pub async fn latest_frame_bytes(&self) -> ApiResult<Option<Vec<u8>>> {
        let path = self.repo.get_config().save_dir.join(LATEST_FRAME);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PollJob for CaptureService {
    fn name(&self) -> &'static str {
        "capture"
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
        // Failures are already recorded in the repo and logged.
        let _ = self.capture_once().await;
    }
}

/// Resize and re-encode a frame, then write the timestamped copy and the `latest` slot
pub async fn persist_frame(config: &CaptureConfig, data: Vec<u8>) -> ApiResult<FrameRecord> {
    let (width, height, quality) = (config.width, config.height, config.quality);
    let (jpeg, out_width, out_height) =
        tokio::task::spawn_blocking(move || encode_frame(&data, width, height, quality)).await??;

    tokio::fs::create_dir_all(&config.save_dir).await?;
    let timestamp = Utc::now();
    let path = config.save_dir.join(frame_file_name(timestamp));
    tokio::fs::write(&path, &jpeg).await?;
    write_latest(&config.save_dir, &jpeg).await?;

    Ok(FrameRecord {
        timestamp,
        path,
        width: out_width,
        height: out_height,
        quality,
        size_bytes: jpeg.len(),
    })
}

fn encode_frame(
    data: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> ApiResult<(Vec<u8>, u32, u32)> {
    let mut img = image::load_from_memory(data)?;
    if width > 0 && height > 0 && (img.width(), img.height()) != (width, height) {
        img = img.resize_exact(width, height, FilterType::Triangle);
    }
    let rgb = img.to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok((buf, rgb.width(), rgb.height()))
}

/// Replace `latest.jpg` via rename so readers never see a half-written file
async fn write_latest(dir: &Path, jpeg: &[u8]) -> ApiResult<()> {
    let tmp = dir.join(format!("{}.tmp", LATEST_FRAME));
    tokio::fs::write(&tmp, jpeg).await?;
    tokio::fs::rename(&tmp, dir.join(LATEST_FRAME)).await?;
    Ok(())
}

/// Dark placeholder served while no frame has been captured yet
pub fn placeholder_jpeg(width: u32, height: u32) -> ApiResult<Vec<u8>> {
    let (width, height) = if width > 0 && height > 0 {
        (width, height)
    } else {
        (640, 480)
    };
    let img = RgbImage::from_pixel(width, height, Rgb([24, 24, 24]));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 70).encode_image(&img)?;
    Ok(buf)
}
