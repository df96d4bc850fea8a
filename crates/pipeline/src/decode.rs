//! Response decoding: raw service text to a typed, validated result.
//!
//! Stages run in a fixed order and each maps to exactly one failure kind:
//!
//! 1. blank text                      -> `EmptyResponse`
//! 2. not JSON                        -> `MalformedResponse`
//! 3. [`Schema::check`] violations    -> `SchemaViolation`
//! 4. typed deserialization failure   -> `SchemaViolation`
//! 5. [`Conform::conform`] violations -> `SchemaViolation`
//!
//! The service's own schema enforcement is never trusted; an empty or
//! partial document is never silently turned into a default value.

use churnguard_core::error::PipelineError;
use churnguard_core::schema::{Conform, Schema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Decode `raw` into `T`, validating it against `schema`.
pub fn decode<T>(raw: &str, schema: &Schema) -> Result<T, PipelineError>
where
    T: DeserializeOwned + Conform,
{
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Err(PipelineError::EmptyResponse);
    }

    let value: Value =
        serde_json::from_str(text).map_err(|e| PipelineError::MalformedResponse {
            reason: e.to_string(),
        })?;

    let violations = schema.check(&value);
    if !violations.is_empty() {
        return Err(PipelineError::SchemaViolation { violations });
    }

    let decoded: T = serde_json::from_value(value)
        .map_err(|e| PipelineError::schema_violation(format!("$: {e}")))?;

    let violations = decoded.conform();
    if !violations.is_empty() {
        return Err(PipelineError::SchemaViolation { violations });
    }

    for advisory in decoded.advisories() {
        warn!(%advisory, "Accepted response with soft-validation finding");
    }

    Ok(decoded)
}

/// Remove a single surrounding Markdown code fence, if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim_start().starts_with(['{', '[']) => inner.trim(),
        _ => body.trim(),
    }
}
