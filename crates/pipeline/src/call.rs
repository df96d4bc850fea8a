//! The schema-constrained remote inference call.
//!
//! One generic type covers both pipelines: a [`PromptTemplate`] supplies the
//! instruction and schema, the [`Provider`] performs exactly one outbound
//! request, and [`decode`] turns the raw text into the template's output.

use std::sync::Arc;

use churnguard_config::PipelineConfig;
use churnguard_core::error::PipelineError;
use churnguard_core::message::Message;
use churnguard_core::provider::{Provider, ProviderRequest, ResponseFormat};
use churnguard_core::schema::Schema;
use tracing::{debug, warn};

use crate::decode::decode;
use crate::prompt::PromptTemplate;

/// Model selection for one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

impl From<&PipelineConfig> for ModelSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// The request a call built from `prompt` and `settings` would send, without
/// binding a provider.
pub fn preview_request<P: PromptTemplate>(
    prompt: &P,
    settings: &ModelSettings,
    input: &P::Input,
) -> ProviderRequest {
    assemble_request(prompt, prompt.schema(), settings, input)
}

fn assemble_request<P: PromptTemplate>(
    prompt: &P,
    schema: Schema,
    settings: &ModelSettings,
    input: &P::Input,
) -> ProviderRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompt.system() {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(prompt.instruction(input)));

    ProviderRequest {
        model: settings.model.clone(),
        messages,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        response_format: ResponseFormat::json(prompt.name(), schema),
    }
}

/// A prompt template bound to a provider and a model.
pub struct SchemaConstrainedCall<P: PromptTemplate> {
    provider: Arc<dyn Provider>,
    prompt: P,
    settings: ModelSettings,
    schema: Schema,
}

impl<P: PromptTemplate> SchemaConstrainedCall<P> {
    pub fn new(provider: Arc<dyn Provider>, prompt: P, settings: ModelSettings) -> Self {
        let schema = prompt.schema();
        Self {
            provider,
            prompt,
            settings,
            schema,
        }
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The exact request `invoke` would send for `input`.
    pub fn build_request(&self, input: &P::Input) -> ProviderRequest {
        assemble_request(&self.prompt, self.schema.clone(), &self.settings, input)
    }

    /// Validate the input, send one request and decode the response.
    ///
    /// Input that fails validation is rejected without contacting the
    /// provider.
    pub async fn invoke(&self, input: &P::Input) -> Result<P::Output, PipelineError> {
        self.prompt.validate(input).inspect_err(|e| {
            warn!(pipeline = self.prompt.name(), error = %e, "Input rejected");
        })?;

        let request = self.build_request(input);
        debug!(
            pipeline = self.prompt.name(),
            provider = self.provider.name(),
            model = %request.model,
            "Dispatching inference request"
        );

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(pipeline = self.prompt.name(), error = %e, "Inference request failed");
            PipelineError::Transport(e)
        })?;

        if let Some(usage) = &response.usage {
            debug!(
                pipeline = self.prompt.name(),
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Inference response received"
            );
        }

        decode(&response.message.content, &self.schema).inspect_err(|e| {
            warn!(pipeline = self.prompt.name(), error = %e, "Response rejected");
        })
    }
}
