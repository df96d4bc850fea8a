//! Error types for the ChurnGuard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all ChurnGuard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Form input ---
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidInput`].
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the inference service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// Authentication, missing models and configuration problems are permanent;
    /// network hiccups, timeouts, rate limits and 5xx responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Network(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimited { .. } => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::AuthenticationFailed(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// Failures of a single pipeline invocation.
///
/// Every variant is local to the invocation that produced it; none of them is
/// fatal to the process.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("transport failure: {0}")]
    Transport(#[from] ProviderError),

    #[error("inference service returned no text")]
    EmptyResponse,

    #[error("response is not valid JSON: {reason}")]
    MalformedResponse { reason: String },

    #[error("response violates the declared schema: {}", .violations.join("; "))]
    SchemaViolation { violations: Vec<String> },

    #[error("invocation was cancelled")]
    Cancelled,

    #[error("input rejected before dispatch: '{field}' {reason}")]
    InvalidInput { field: String, reason: String },
}

impl From<Error> for PipelineError {
    /// Input checks report through [`Error::InvalidInput`]; anything else
    /// raised before dispatch is filed under the whole input.
    fn from(error: Error) -> Self {
        match error {
            Error::InvalidInput { field, reason } => PipelineError::InvalidInput { field, reason },
            Error::Pipeline(inner) => inner,
            other => PipelineError::InvalidInput {
                field: "input".into(),
                reason: other.to_string(),
            },
        }
    }
}

impl PipelineError {
    /// The coarse failure category, as shown to the rendering layer.
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Transport(_) => FailureKind::TransportFailure,
            PipelineError::EmptyResponse => FailureKind::EmptyResponse,
            PipelineError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            PipelineError::SchemaViolation { .. } => FailureKind::SchemaViolation,
            PipelineError::Cancelled => FailureKind::Cancelled,
            PipelineError::InvalidInput { .. } => FailureKind::InvalidInput,
        }
    }

    pub fn schema_violation(violation: impl Into<String>) -> Self {
        PipelineError::SchemaViolation {
            violations: vec![violation.into()],
        }
    }
}

/// Serializable failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    TransportFailure,
    EmptyResponse,
    MalformedResponse,
    SchemaViolation,
    Cancelled,
    InvalidInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn schema_violation_lists_every_problem() {
        let err = PipelineError::SchemaViolation {
            violations: vec![
                "$.churnProbability: 1.4 is above maximum 1".into(),
                "$.riskLevel: required field is missing".into(),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("churnProbability"));
        assert!(text.contains("riskLevel"));
    }

    #[test]
    fn transport_kind_wraps_provider_errors() {
        let err: PipelineError = ProviderError::AuthenticationFailed("bad key".into()).into();
        assert_eq!(err.kind(), FailureKind::TransportFailure);
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn input_errors_become_invalid_input_failures() {
        let err: PipelineError = Error::invalid_input("monthlyCharges", "must not be negative").into();
        assert_eq!(err.kind(), FailureKind::InvalidInput);
        assert!(err.to_string().contains("monthlyCharges"));
        assert_eq!(
            serde_json::to_value(FailureKind::InvalidInput).unwrap(),
            serde_json::json!("invalidInput")
        );
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(ProviderError::RateLimited { retry_after_secs: 1 }.is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into()
            }
            .is_transient()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad request".into()
            }
            .is_transient()
        );
        assert!(!ProviderError::AuthenticationFailed("nope".into()).is_transient());
    }

    #[test]
    fn invalid_input_names_the_field() {
        let err = Error::invalid_input("tenureMonths", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid input for 'tenureMonths': must not be negative"
        );
    }

    #[test]
    fn failure_kind_serializes_camel_case() {
        let json = serde_json::to_string(&FailureKind::SchemaViolation).unwrap();
        assert_eq!(json, "\"schemaViolation\"");
    }
}
