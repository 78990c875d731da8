/// External clients: frame sources and the inference service
pub mod anthropic;
pub mod frames;

pub use anthropic::{AnthropicClient, InferenceClient};
pub use frames::{FrameSource, LocatorFrameSource};

use crate::errors::ApiResult;
use reqwest::{redirect::Policy, Client};

/// HTTP client wrapper with common configuration.
/// Timeouts are set per request from the live scheduler configuration.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent("sky-watch/0.1")
            .redirect(Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}
