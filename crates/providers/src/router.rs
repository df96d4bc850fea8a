//! Provider router: builds the configured inference backend.
//!
//! `gemini` uses the native API; every other name goes through the
//! OpenAI-compatible client. The result is always wrapped in a
//! [`RetryProvider`] carrying the configured timeout and retry budget.

use std::sync::Arc;
use std::time::Duration;

use churnguard_config::{AppConfig, ConfigError};
use churnguard_core::provider::Provider;

use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RetryProvider;

/// Build the provider described by `config`.
///
/// Fails fast when the credential is missing or the backend is unknown and
/// has no `api_url`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let api_key = config.require_api_key()?.unwrap_or_default();
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let name = config.provider.as_str();

    let inner: Arc<dyn Provider> = if name == "gemini" {
        let mut provider = GeminiProvider::with_timeout(api_key, timeout);
        if let Some(url) = &config.api_url {
            provider = provider.with_base_url(url);
        }
        Arc::new(provider)
    } else {
        let base_url = match (&config.api_url, default_base_url(name)) {
            (Some(url), _) => url.clone(),
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(ConfigError::ValidationError(format!(
                    "provider '{name}' has no known endpoint; set api_url"
                )));
            }
        };
        Arc::new(OpenAiCompatProvider::with_timeout(
            name, base_url, api_key, timeout,
        ))
    };

    tracing::debug!(
        provider = name,
        max_retries = config.max_retries,
        timeout_secs = config.request_timeout_secs,
        "Built inference provider"
    );

    Ok(Arc::new(
        RetryProvider::new(inner)
            .with_max_retries(config.max_retries)
            .with_timeout(timeout),
    ))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "gemini" => Some(crate::gemini::DEFAULT_BASE_URL),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        _ => None,
    }
}
