//! Mock provider and state for gateway tests.

use std::sync::Arc;

use churnguard_config::AppConfig;
use churnguard_core::error::ProviderError;
use churnguard_core::message::Message;
use churnguard_core::provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat};

use crate::{GatewayState, SharedState};

pub const ASSESSMENT_JSON: &str = r#"{"churnProbability":0.82,"riskLevel":"Critical","topFactors":[{"factor":"Tenure","weight":0.4}],"recommendation":"Offer retention bundle","reasoning":"x","modelComparison":[{"name":"XGBoost","score":0.84}]}"#;

pub const PORTFOLIO_JSON: &str =
    r#"{"sourceCode":"print('churn')","documentation":"ChurnGuard-ML README"}"#;

enum Mode {
    Healthy,
    Failing,
    Hanging,
}

/// Answers each pipeline with a canned payload, fails, or never answers.
pub struct MockProvider {
    mode: Mode,
}

impl MockProvider {
    pub fn healthy() -> Self {
        Self {
            mode: Mode::Healthy,
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: Mode::Failing,
        }
    }

    pub fn hanging() -> Self {
        Self {
            mode: Mode::Hanging,
        }
    }
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "gateway_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match self.mode {
            Mode::Healthy => {}
            Mode::Failing => return Err(ProviderError::Network("connection refused".into())),
            Mode::Hanging => std::future::pending::<()>().await,
        }

        let text = match &request.response_format {
            ResponseFormat::Json { name, .. } if name == "portfolio_assets" => PORTFOLIO_JSON,
            _ => ASSESSMENT_JSON,
        };
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "mock-model".into(),
        })
    }
}

pub fn test_state(provider: MockProvider) -> SharedState {
    Arc::new(GatewayState::new(Arc::new(provider), AppConfig::default()))
}
