//! HTTP API v1, consumed by the rendering layer.
//!
//! Endpoints:
//!
//! - `GET    /v1/dashboard`             - Static display constants
//! - `POST   /v1/predictions`           - Submit a customer form for assessment
//! - `GET    /v1/predictions/current`   - Current assessment view
//! - `GET    /v1/predictions/events`    - SSE stream of assessment views
//! - `DELETE /v1/predictions/current`   - Cancel the in-flight assessment
//! - `GET    /v1/portfolio`             - Portfolio assets fetched at startup
//! - `GET    /v1/schemas`               - Declared output schemas

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
};
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tracing::info;

use churnguard_core::display::{DashboardConstants, dashboard_constants};
use churnguard_core::error::{FailureKind, PipelineError};
use churnguard_core::{ChurnAssessment, CustomerForm, CustomerRecord, Error, PortfolioAssets};
use churnguard_pipeline::Snapshot;

use crate::SharedState;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/predictions", axum::routing::post(create_prediction_handler))
        .route(
            "/predictions/current",
            get(current_prediction_handler).delete(cancel_prediction_handler),
        )
        .route("/predictions/events", get(prediction_events_handler))
        .route("/portfolio", get(portfolio_handler))
        .route("/schemas", get(schemas_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureView {
    pub kind: FailureKind,
    pub message: String,
}

impl From<&PipelineError> for FailureView {
    fn from(error: &PipelineError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// What the rendering layer shows for the churn pipeline.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    pub sequence: u64,
    pub status: &'static str,
    pub loading: bool,
    pub assessment: Option<ChurnAssessment>,
    pub error: Option<FailureView>,
}

impl From<&Snapshot<ChurnAssessment>> for PredictionView {
    fn from(snapshot: &Snapshot<ChurnAssessment>) -> Self {
        Self {
            sequence: snapshot.sequence,
            status: snapshot.status(),
            loading: snapshot.is_loading(),
            assessment: snapshot.result().cloned(),
            error: snapshot.error().map(FailureView::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub loading: bool,
    pub assets: Option<PortfolioAssets>,
    pub error: Option<FailureView>,
}

impl From<&Snapshot<PortfolioAssets>> for PortfolioView {
    fn from(snapshot: &Snapshot<PortfolioAssets>) -> Self {
        Self {
            loading: snapshot.is_loading(),
            assets: snapshot.result().cloned(),
            error: snapshot.error().map(FailureView::from),
        }
    }
}

#[derive(Serialize)]
struct SubmittedResponse {
    sequence: u64,
}

#[derive(Serialize)]
struct CancelResponse {
    cancelled: bool,
}

#[derive(Serialize)]
struct SchemasResponse {
    churn: serde_json::Value,
    portfolio: serde_json::Value,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn dashboard_handler() -> Json<DashboardConstants> {
    Json(dashboard_constants())
}

/// `POST /v1/predictions`: validate the form and start an assessment.
/// A newer submission supersedes any assessment still in flight.
async fn create_prediction_handler(
    State(state): State<SharedState>,
    Json(form): Json<CustomerForm>,
) -> Result<(StatusCode, Json<SubmittedResponse>), (StatusCode, Json<ErrorResponse>)> {
    let record = CustomerRecord::try_from(form).map_err(|e| {
        let field = match &e {
            Error::InvalidInput { field, .. } => Some(field.clone()),
            _ => None,
        };
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
                field,
            }),
        )
    })?;

    let sequence = state.churn.submit(record);
    info!(sequence, "Prediction submitted");
    Ok((StatusCode::ACCEPTED, Json(SubmittedResponse { sequence })))
}

async fn current_prediction_handler(State(state): State<SharedState>) -> Json<PredictionView> {
    Json(PredictionView::from(&state.churn.snapshot()))
}

async fn cancel_prediction_handler(State(state): State<SharedState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.churn.cancel(),
    })
}

/// `GET /v1/predictions/events`: the current view, then one event per
/// state change. The event name is the state (`pending`, `resolved`, ...).
async fn prediction_events_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = WatchStream::new(state.churn.subscribe()).map(|snapshot| {
        let view = PredictionView::from(&snapshot);
        let data = serde_json::to_string(&view).unwrap_or_default();
        Ok(SseEvent::default().event(view.status).data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn portfolio_handler(State(state): State<SharedState>) -> Json<PortfolioView> {
    Json(PortfolioView::from(&state.portfolio.snapshot()))
}

async fn schemas_handler(State(state): State<SharedState>) -> Json<SchemasResponse> {
    Json(SchemasResponse {
        churn: state.churn.call().schema().to_json_schema(),
        portfolio: state.portfolio.call().schema().to_json_schema(),
    })
}
