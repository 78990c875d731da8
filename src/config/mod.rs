/// Application configuration module
use crate::domain::{AnalysisConfig, CaptureConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Process root tried when resolving relative image paths
    pub app_root: PathBuf,
    /// Decoder used for live stream locators
    pub ffmpeg_bin: String,
    pub api_key: Option<String>,
    pub capture: CaptureConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let capture = CaptureConfig {
            source_url: env_string("RTSP_URL", "frames/source.jpg"),
            save_dir: PathBuf::from(env_string("SAVE_DIR", "frames")),
            interval_secs: env_parse("INTERVAL", 60u64).max(1),
            timeout_secs: env_parse("CAPTURE_TIMEOUT", 5u64).max(1),
            width: env_parse("WIDTH", 640),
            height: env_parse("HEIGHT", 480),
            quality: env_parse("QUALITY", 85u8).clamp(1, 100),
            running: false,
        };

        let analysis = AnalysisConfig {
            image_url: env_string("IMAGE_URL", "frames/latest.jpg"),
            api_url: env_string("ANTHROPIC_API_URL", "https://api.anthropic.com/v1/messages"),
            model: env_string("ANTHROPIC_MODEL", "claude-3-haiku-20240307"),
            max_tokens: env_parse("MAX_TOKENS", 1000),
            temperature: env_parse("TEMPERATURE", 0.2f32).clamp(0.0, 1.0),
            interval_secs: env_parse("ANALYSIS_INTERVAL", 300u64).max(1),
            timeout_secs: env_parse("ANALYSIS_TIMEOUT", 60u64).max(1),
            history_capacity: env_parse("HISTORY_SIZE", 20usize).max(1),
            running: false,
        };

        Ok(Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_parse("PORT", 7860),
            app_root: PathBuf::from(env_string("APP_ROOT", "/app")),
            ffmpeg_bin: env_string("FFMPEG_BIN", "ffmpeg"),
            api_key: env::var(API_KEY_VAR).ok().filter(|k| !k.trim().is_empty()),
            capture,
            analysis,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    parse_or(env::var(key).ok(), default)
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}
