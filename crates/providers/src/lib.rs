//! Inference provider implementations for ChurnGuard.
//!
//! All providers implement the `churnguard_core::Provider` trait.
//! The router builds the configured provider from `AppConfig`.

pub mod gemini;
pub mod openai_compat;
pub mod retry;
pub mod router;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryProvider;
pub use router::build_from_config;

use churnguard_core::error::ProviderError;
use std::time::Duration;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the shared HTTP client, falling back to reqwest's defaults if the
/// configured builder cannot be constructed.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to build configured HTTP client, using defaults");
            reqwest::Client::new()
        })
}

/// Classify a failure to get any response at all.
pub(crate) fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Classify a non-2xx response.
pub(crate) fn status_error(status: u16, model: &str, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(if body.is_empty() {
            "Invalid API key or insufficient permissions".into()
        } else {
            body
        }),
        404 => ProviderError::ModelNotFound(model.to_string()),
        429 => ProviderError::RateLimited {
            retry_after_secs: 5,
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}
