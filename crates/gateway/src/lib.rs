//! HTTP API gateway for ChurnGuard.
//!
//! Serves the rendering layer: the current churn assessment, the portfolio
//! assets fetched at startup, the static dashboard constants, and form
//! submission for new predictions.
//!
//! Built on Axum.

pub mod api_v1;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, extract::State, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use churnguard_config::AppConfig;
use churnguard_core::Provider;
use churnguard_pipeline::{ChurnPipeline, PortfolioPipeline, churn_pipeline, portfolio_pipeline};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider_name: String,
    pub churn: ChurnPipeline,
    pub portfolio: PortfolioPipeline,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Both pipelines share one provider.
    pub fn new(provider: Arc<dyn Provider>, config: AppConfig) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            churn: churn_pipeline(provider.clone(), &config),
            portfolio: portfolio_pipeline(provider, &config),
            config,
        }
    }

    /// Kick off the one-time portfolio fetch. Returns its sequence number.
    pub fn prefetch_portfolio(&self) -> u64 {
        self.portfolio.submit(())
    }
}

/// Build the router with all gateway routes.
///
/// Layers applied:
/// - CORS restricted to the configured origins
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.allowed_origins);

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
///
/// Fails before binding when the credential is missing. The portfolio
/// pipeline is invoked once here and never again.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = churnguard_providers::build_from_config(&config)?;
    let state = Arc::new(GatewayState::new(provider, config));
    state.prefetch_portfolio();

    let app = build_router(state.clone());

    info!(addr = %addr, provider = %state.provider_name, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider_name.clone(),
    })
}
