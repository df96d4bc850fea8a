//! Prompt builders: typed input in, instruction text and output schema out.
//!
//! A [`PromptTemplate`] is pure. It performs no I/O and renders the same
//! instruction for the same input, which is what makes a pipeline's request
//! reproducible.

pub mod churn;
pub mod portfolio;

pub use churn::{ChurnPrompt, churn_schema};
pub use portfolio::{PortfolioPrompt, portfolio_schema};

use churnguard_core::Conform;
use churnguard_core::error::PipelineError;
use churnguard_core::schema::Schema;
use serde::de::DeserializeOwned;

/// The request side of one schema-constrained pipeline.
pub trait PromptTemplate: Send + Sync + 'static {
    /// What the pipeline consumes.
    type Input: Send + Sync + 'static;

    /// What the pipeline produces once decoded.
    type Output: DeserializeOwned + Conform + Clone + Send + Sync + 'static;

    /// Short identifier, used as the structured-output name and in logs.
    fn name(&self) -> &'static str;

    /// Optional persona or output rules sent ahead of the instruction.
    fn system(&self) -> Option<String> {
        None
    }

    /// Reject input that must not reach the inference service.
    fn validate(&self, _input: &Self::Input) -> Result<(), PipelineError> {
        Ok(())
    }

    /// Render the instruction for `input`.
    fn instruction(&self, input: &Self::Input) -> String;

    /// The schema the response must satisfy.
    fn schema(&self) -> Schema;
}
