//! # ChurnGuard Core
//!
//! Domain types, traits, and error definitions for the ChurnGuard inference
//! pipelines. This crate has **no transport or runtime dependencies**; it
//! defines the domain model that the provider, pipeline and gateway crates
//! implement against.

pub mod assessment;
pub mod customer;
pub mod display;
pub mod error;
pub mod message;
pub mod provider;
pub mod schema;

// Re-export key types at crate root for ergonomics
pub use assessment::{ChurnAssessment, FactorWeight, ModelScore, PortfolioAssets, RiskLevel};
pub use customer::{ContractType, CustomerForm, CustomerRecord, FormNumber, InternetService, YesNo};
pub use display::{DashboardConstants, dashboard_constants};
pub use error::{Error, FailureKind, PipelineError, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ResponseFormat, Usage};
pub use schema::{Conform, Schema, SchemaKind};
