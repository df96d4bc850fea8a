//! Google Gemini native provider implementation.
//!
//! Uses the `generateContent` endpoint directly (not an OpenAI-compatible
//! proxy).
//!
//! Features:
//! - `x-goog-api-key` header authentication (not Bearer)
//! - System instruction as a top-level field
//! - Structured output via `responseMimeType` + `responseSchema`, with the
//!   schema rendered in Gemini's upper-case type dialect

use async_trait::async_trait;
use churnguard_core::error::ProviderError;
use churnguard_core::message::{Message, Role};
use churnguard_core::provider::*;
use churnguard_core::schema::{Schema, SchemaKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{DEFAULT_TIMEOUT, http_client, send_error, status_error};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_timeout(api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http_client(timeout),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Split system messages out of the message list.
    /// Gemini takes the system instruction as a top-level field.
    fn extract_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut rest: Vec<&Message> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                _ => rest.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, rest)
    }

    fn to_contents(messages: &[&Message]) -> Vec<GeminiContent> {
        messages
            .iter()
            .map(|m| GeminiContent {
                role: Some(
                    match m.role {
                        Role::Assistant => "model",
                        _ => "user",
                    }
                    .into(),
                ),
                parts: vec![GeminiPart {
                    text: Some(m.content.clone()),
                }],
            })
            .collect()
    }

    /// The `generateContent` request body.
    fn request_body(request: &ProviderRequest) -> Value {
        let (system, rest) = Self::extract_system(&request.messages);

        let mut generation = Map::new();
        generation.insert("temperature".into(), json!(request.temperature));
        if let Some(max_tokens) = request.max_tokens {
            generation.insert("maxOutputTokens".into(), json!(max_tokens));
        }
        if let ResponseFormat::Json { schema, .. } = &request.response_format {
            generation.insert("responseMimeType".into(), json!("application/json"));
            generation.insert("responseSchema".into(), gemini_schema(schema));
        }

        let mut body = json!({
            "contents": Self::to_contents(&rest),
            "generationConfig": Value::Object(generation),
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }

    fn into_response(api: GenerateResponse, requested_model: &str) -> ProviderResponse {
        // Text is every text part of the first candidate, concatenated.
        let text: String = api
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        let usage = api.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        ProviderResponse {
            message: Message::assistant(text),
            usage,
            model: api
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        }
    }
}

#[async_trait]
impl churnguard_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::request_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            structured = request.response_format.schema().is_some(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(status_error(status, &request.model, error_body));
        }

        let api: GenerateResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: status,
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(Self::into_response(api, &request.model))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(send_error)?;

        Ok(response.status().is_success())
    }
}

/// Render a schema in Gemini's OpenAPI-subset dialect.
///
/// Types are upper-case, string enums carry `format: "enum"`, and object
/// properties keep their declared order through `propertyOrdering`.
/// `additionalProperties` is not part of the dialect and is omitted.
pub fn gemini_schema(schema: &Schema) -> Value {
    let mut node = Map::new();
    node.insert("type".into(), json!(schema.type_name().to_uppercase()));
    if let Some(description) = &schema.description {
        node.insert("description".into(), json!(description));
    }

    match &schema.kind {
        SchemaKind::Object {
            properties,
            required,
        } => {
            let props: Map<String, Value> = properties
                .iter()
                .map(|(name, child)| (name.clone(), gemini_schema(child)))
                .collect();
            let order: Vec<&str> = properties.iter().map(|(name, _)| name.as_str()).collect();
            node.insert("properties".into(), Value::Object(props));
            node.insert("required".into(), json!(required));
            node.insert("propertyOrdering".into(), json!(order));
        }
        SchemaKind::Array { items } => {
            node.insert("items".into(), gemini_schema(items));
        }
        SchemaKind::String { allowed } if !allowed.is_empty() => {
            node.insert("format".into(), json!("enum"));
            node.insert("enum".into(), json!(allowed));
        }
        SchemaKind::Number { minimum, maximum } => {
            if let Some(min) = minimum {
                node.insert("minimum".into(), json!(min));
            }
            if let Some(max) = maximum {
                node.insert("maximum".into(), json!(max));
            }
        }
        SchemaKind::Integer { minimum: Some(min) } => {
            node.insert("minimum".into(), json!(min));
        }
        _ => {}
    }

    Value::Object(node)
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnguard_core::Provider;

    fn churn_like_schema() -> Schema {
        Schema::object()
            .required("churnProbability", Schema::number().range(0.0, 1.0))
            .required(
                "riskLevel",
                Schema::string_enum(["Low", "Medium", "High", "Critical"]),
            )
            .required(
                "topFactors",
                Schema::array(
                    Schema::object()
                        .required("factor", Schema::string())
                        .required("weight", Schema::number()),
                ),
            )
    }

    #[test]
    fn constructor() {
        let provider = GeminiProvider::new("key");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = GeminiProvider::new("key").with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(provider.base_url, "http://localhost:9000/v1beta");
    }

    #[test]
    fn system_extraction() {
        let messages = vec![Message::system("Be precise"), Message::user("Analyze")];
        let (system, rest) = GeminiProvider::extract_system(&messages);
        assert_eq!(system.as_deref(), Some("Be precise"));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].role, Role::User);
    }

    #[test]
    fn schema_uses_upper_case_dialect() {
        let rendered = gemini_schema(&churn_like_schema());
        assert_eq!(rendered["type"], "OBJECT");
        assert_eq!(rendered["properties"]["churnProbability"]["type"], "NUMBER");
        assert_eq!(rendered["properties"]["churnProbability"]["maximum"], 1.0);
        assert_eq!(rendered["properties"]["riskLevel"]["format"], "enum");
        assert_eq!(rendered["properties"]["riskLevel"]["enum"][3], "Critical");
        assert_eq!(rendered["properties"]["topFactors"]["type"], "ARRAY");
        assert_eq!(
            rendered["properties"]["topFactors"]["items"]["properties"]["weight"]["type"],
            "NUMBER"
        );
        assert_eq!(rendered["propertyOrdering"][0], "churnProbability");
        assert!(rendered.get("additionalProperties").is_none());
    }

    #[test]
    fn structured_request_body() {
        let mut request = ProviderRequest::new(
            "gemini-3-pro-preview",
            vec![Message::system("rules"), Message::user("customer data")],
        );
        request.max_tokens = Some(1024);
        request.response_format = ResponseFormat::json("churn_assessment", churn_like_schema());

        let body = GeminiProvider::request_body(&request);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "rules");
        assert_eq!(body["contents"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "customer data");
        let generation = &body["generationConfig"];
        assert_eq!(generation["responseMimeType"], "application/json");
        assert_eq!(generation["maxOutputTokens"], 1024);
        assert_eq!(generation["responseSchema"]["required"][1], "riskLevel");
    }

    #[test]
    fn text_request_body_has_no_schema() {
        let request = ProviderRequest::new("gemini-3-flash-preview", vec![Message::user("hi")]);
        let body = GeminiProvider::request_body(&request);
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn parse_text_response() {
        let data = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"churn"}, {"text": "Probability\": 0.8}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 12, "totalTokenCount": 52},
            "modelVersion": "gemini-3-pro-preview-001"
        }"#;
        let api: GenerateResponse = serde_json::from_str(data).unwrap();
        let response = GeminiProvider::into_response(api, "gemini-3-pro-preview");
        assert_eq!(response.message.content, "{\"churnProbability\": 0.8}");
        assert_eq!(response.model, "gemini-3-pro-preview-001");
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 40);
        assert_eq!(usage.total_tokens, 52);
    }

    #[test]
    fn no_candidates_yields_empty_text() {
        let api: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let response = GeminiProvider::into_response(api, "gemini-3-pro-preview");
        assert!(response.message.content.is_empty());
        assert_eq!(response.model, "gemini-3-pro-preview");
    }
}
