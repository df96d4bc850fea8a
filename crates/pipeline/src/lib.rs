//! Structured inference pipelines for ChurnGuard.
//!
//! Each pipeline is Prompt Builder → Inference Client → Response Decoder,
//! expressed once as [`SchemaConstrainedCall`] and instantiated twice:
//!
//! - churn inference: [`CustomerRecord`] → [`ChurnAssessment`]
//! - portfolio synthesis: no input → [`PortfolioAssets`]
//!
//! A [`PipelineRunner`] owns the single state cell a pipeline's consumers
//! read from, and guarantees only the latest invocation's result lands there.
//!
//! [`CustomerRecord`]: churnguard_core::CustomerRecord
//! [`ChurnAssessment`]: churnguard_core::ChurnAssessment
//! [`PortfolioAssets`]: churnguard_core::PortfolioAssets

pub mod call;
pub mod decode;
pub mod orchestrator;
pub mod prompt;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use call::{ModelSettings, SchemaConstrainedCall, preview_request};
pub use decode::decode;
pub use orchestrator::{Orchestrator, Outcome, PipelineState, Snapshot};
pub use prompt::{ChurnPrompt, PortfolioPrompt, PromptTemplate};
pub use runner::PipelineRunner;

use std::sync::Arc;

use churnguard_config::AppConfig;
use churnguard_core::Provider;

pub type ChurnPipeline = PipelineRunner<ChurnPrompt>;
pub type PortfolioPipeline = PipelineRunner<PortfolioPrompt>;

/// The churn pipeline as configured: churn model settings and currency label.
pub fn churn_pipeline(provider: Arc<dyn Provider>, config: &AppConfig) -> ChurnPipeline {
    PipelineRunner::new(SchemaConstrainedCall::new(
        provider,
        ChurnPrompt::new(config.currency.clone()),
        ModelSettings::from(&config.churn),
    ))
}

/// The portfolio pipeline as configured.
pub fn portfolio_pipeline(provider: Arc<dyn Provider>, config: &AppConfig) -> PortfolioPipeline {
    PipelineRunner::new(SchemaConstrainedCall::new(
        provider,
        PortfolioPrompt::default(),
        ModelSettings::from(&config.portfolio),
    ))
}
