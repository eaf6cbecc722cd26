//! HTTP client building and response helpers.

mod client;

pub use client::{HttpClientBuilder, HttpClientConfig, DEFAULT_TIMEOUT};

use tracing::warn;

use crate::error::{status_error, Error};

/// Passes a 2xx response through, or turns the status and body text into an error.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    warn!("{url} answered {status}: {body}");

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body
    };

    Err(status_error(status.as_u16(), message))
}
