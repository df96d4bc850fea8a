//! `churnguard schema` - Print the request a pipeline would send.
//!
//! Works offline: no credential is needed and nothing is sent.

use std::path::Path;

use churnguard_config::AppConfig;
use churnguard_core::{CustomerRecord, ProviderRequest, ResponseFormat};
use churnguard_pipeline::{ChurnPrompt, ModelSettings, PortfolioPrompt, preview_request};
use churnguard_providers::gemini::gemini_schema;
use clap::ValueEnum;
use serde_json::{Value, json};

use super::load_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PipelineKind {
    Churn,
    Portfolio,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Dialect {
    /// Standard JSON Schema
    JsonSchema,
    /// Gemini `responseSchema`
    Gemini,
}

pub fn run(
    config_path: &Path,
    pipeline: PipelineKind,
    dialect: Dialect,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let request = build(&config, pipeline);
    println!("{}", serde_json::to_string_pretty(&describe(&request, dialect))?);
    Ok(())
}

/// The churn preview uses the default example customer.
fn build(config: &AppConfig, pipeline: PipelineKind) -> ProviderRequest {
    match pipeline {
        PipelineKind::Churn => preview_request(
            &ChurnPrompt::new(config.currency.clone()),
            &ModelSettings::from(&config.churn),
            &CustomerRecord::default(),
        ),
        PipelineKind::Portfolio => preview_request(
            &PortfolioPrompt::default(),
            &ModelSettings::from(&config.portfolio),
            &(),
        ),
    }
}

fn describe(request: &ProviderRequest, dialect: Dialect) -> Value {
    let response_format = match &request.response_format {
        ResponseFormat::Text => json!({ "type": "text" }),
        ResponseFormat::Json { name, schema } => json!({
            "type": "json",
            "name": name,
            "schema": match dialect {
                Dialect::JsonSchema => schema.to_json_schema(),
                Dialect::Gemini => gemini_schema(schema),
            },
        }),
    };

    json!({
        "model": request.model,
        "temperature": request.temperature,
        "maxTokens": request.max_tokens,
        "messages": request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect::<Vec<_>>(),
        "responseFormat": response_format,
    })
}
