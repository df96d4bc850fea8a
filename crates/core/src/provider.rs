//! Provider trait: the abstraction over inference backends.
//!
//! A Provider knows how to send a short message list to a hosted model and
//! get the generated text back. When the request carries a
//! [`ResponseFormat::Json`] schema, the provider forwards it in its own
//! dialect so the service constrains its output; the caller still validates
//! what comes back.
//!
//! Implementations: native Gemini, OpenAI-compatible endpoints, the retry
//! wrapper, and scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;
use crate::schema::Schema;

/// How the service should shape its output.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text.
    #[default]
    Text,
    /// A JSON document matching `schema`.
    Json {
        /// Short identifier some dialects require (e.g. `churn_assessment`).
        name: String,
        schema: Schema,
    },
}

impl ResponseFormat {
    pub fn json(name: impl Into<String>, schema: Schema) -> Self {
        Self::Json {
            name: name.into(),
            schema,
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        match self {
            ResponseFormat::Text => None,
            ResponseFormat::Json { schema, .. } => Some(schema),
        }
    }
}

/// Configuration for a provider request.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gemini-3-pro-preview")
    pub model: String,

    /// The messages, system instruction first when present
    pub messages: Vec<Message>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Requested output shape
    pub response_format: ResponseFormat,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            response_format: ResponseFormat::Text,
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated message; its content is the raw service text
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// Pipelines call `complete()` without knowing which backend is configured.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ProviderResponse {
                message: Message::assistant(last),
                usage: None,
                model: request.model,
            })
        }
    }

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new("gemini-3-pro-preview", vec![]);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, None);
        assert_eq!(req.response_format, ResponseFormat::Text);
        assert!(req.response_format.schema().is_none());
    }

    #[test]
    fn json_format_exposes_schema() {
        let schema = Schema::object().required("ok", Schema::boolean());
        let format = ResponseFormat::json("probe", schema.clone());
        assert_eq!(format.schema(), Some(&schema));
    }

    #[tokio::test]
    async fn default_health_check_is_ok() {
        let echo = Echo;
        assert!(echo.health_check().await.unwrap());
        let resp = echo
            .complete(ProviderRequest::new("m", vec![Message::user("hi")]))
            .await
            .unwrap();
        assert_eq!(resp.message.content, "hi");
        assert_eq!(resp.model, "m");
    }
}
