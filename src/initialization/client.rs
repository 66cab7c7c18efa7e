//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::OllamaConfig;

/// User-Agent sent to the inference service
const USER_AGENT: &str = concat!("bounce_analyzer/", env!("CARGO_PKG_VERSION"));

/// Initializes the HTTP client used for inference calls.
///
/// The client timeout is set slightly above the per-call timeout so that the
/// caller's `tokio::time::timeout` fires first and is reported as a timeout.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_inference_client(config: &OllamaConfig) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .timeout(config.timeout + Duration::from_secs(5))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
}
