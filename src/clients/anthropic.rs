/// Inference client adapter for the Anthropic Messages API
///
/// Sends one frame plus a fixed meteorologist prompt and extracts the structured
/// weather report embedded in the first text block of the reply.
use super::HttpClient;
use crate::config::API_KEY_VAR;
use crate::domain::{AnalysisConfig, WeatherReport};
use crate::errors::{ApiError, ApiResult};
use crate::utils::{extract_json_span, num, s_pick};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

/// API version header
const API_VERSION: &str = "2023-06-01";

const WEATHER_PROMPT: &str = r#"You are an expert meteorologist analysing still images from an outdoor camera.
Analyse the supplied image and report:

1. Cloud coverage as a percentage (0-100)
2. The type of clouds, if any (cumulus, stratus, nimbostratus, cirrus, ...)
3. Visibility (excellent, good, moderate, poor)
4. A short description of the current weather conditions
5. Your confidence in the analysis (0-100)

Answer in the following JSON format:
{
  "cloud_coverage": <number from 0 to 100>,
  "cloud_type": "<cloud type>",
  "visibility": "<excellent/good/moderate/poor>",
  "weather_conditions": "<short description of the weather>",
  "confidence": <number from 0 to 100>
}

Base the answer ONLY on what is visible in the image. If the image is too dark, blurred
or otherwise unclear, say so in "weather_conditions" and lower "confidence".

Reply with the JSON object only, without any additional text."#;

/// Capability to turn image bytes into a structured weather report
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn analyze(&self, image: &[u8], config: &AnalysisConfig) -> ApiResult<WeatherReport>;
}

/// Anthropic Messages API client
pub struct AnthropicClient {
    http: HttpClient,
    api_key: Option<String>,
}

impl AnthropicClient {
    pub fn new(http: HttpClient, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

// =============================================================================
// Anthropic API Types
// =============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart<'a> {
    Text { text: &'a str },
    Image { source: ImageSource },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[async_trait]
impl InferenceClient for AnthropicClient {
    async fn analyze(&self, image: &[u8], config: &AnalysisConfig) -> ApiResult<WeatherReport> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ApiError::MissingCredential(API_KEY_VAR))?;

        let request = MessagesRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: WEATHER_PROMPT,
                    },
                    ContentPart::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: media_type(image),
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        },
                    },
                ],
            }],
        };

        tracing::info!(model = %config.model, size = image.len(), "Sending image to inference API");
        let started = Instant::now();
        let timeout = config.timeout();

        let response = self
            .http
            .get_client()
            .post(&config.api_url)
            .timeout(timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::AcquisitionTimeout(timeout)
                } else {
                    ApiError::ExternalApi(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::AcquisitionTimeout(timeout)
            } else {
                ApiError::ExternalApi(e)
            }
        })?;
        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(status = %status, elapsed_secs = elapsed, "Inference API responded");

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(err) => format!("{} - {}", err.error.error_type, err.error.message),
                Err(_) => body,
            };
            return Err(ApiError::UpstreamRejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResult(format!("response is not JSON: {}", e)))?;
        let text = first_text_block(&envelope)
            .ok_or_else(|| ApiError::MalformedResult("empty content block".to_string()))?;

        parse_report(text, elapsed)
    }
}

fn media_type(image: &[u8]) -> &'static str {
    match image::guess_format(image) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "image/jpeg",
    }
}

/// Text of the first content block carrying non-empty text
fn first_text_block(envelope: &Value) -> Option<&str> {
    envelope
        .get("content")?
        .as_array()?
        .iter()
        .find_map(|block| block.get("text").and_then(Value::as_str))
        .filter(|text| !text.trim().is_empty())
}

/// Parse the structured object embedded in free-form text.
/// Missing fields default to empty/zero; present numeric fields must be numbers.
fn parse_report(text: &str, elapsed: f64) -> ApiResult<WeatherReport> {
    let span = extract_json_span(text)
        .ok_or_else(|| ApiError::MalformedResult("no JSON object in response".to_string()))?;

    let raw: Value = serde_json::from_str(span)
        .map_err(|e| ApiError::MalformedResult(format!("invalid JSON object: {}", e)))?;
    if !raw.is_object() {
        return Err(ApiError::MalformedResult(
            "structured result is not an object".to_string(),
        ));
    }

    let number = |key: &str| -> ApiResult<f64> {
        match raw.get(key) {
            None | Some(Value::Null) => Ok(0.0),
            Some(v) => num(v).ok_or_else(|| {
                ApiError::MalformedResult(format!("{} is not a number: {}", key, v))
            }),
        }
    };
    let cloud_coverage = number("cloud_coverage")?;
    let confidence = number("confidence")?;

    Ok(WeatherReport {
        cloud_coverage,
        cloud_type: s_pick(&raw, &["cloud_type"]).unwrap_or_default(),
        visibility: s_pick(&raw, &["visibility"]).unwrap_or_default(),
        weather_conditions: s_pick(&raw, &["weather_conditions"]).unwrap_or_default(),
        confidence,
        analysis_time: elapsed,
        full_analysis: text.to_string(),
        raw,
    })
}
