//! HTTP surface: router, shared state and error mapping.

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::core::AppError;
use crate::history::HistoryService;
use crate::store::FundStore;
use crate::sync::SyncPipeline;

pub mod funds;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FundStore>,
    pub history: Arc<HistoryService>,
    pub sync: Arc<SyncPipeline>,
    pub default_sync_limit: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(funds::health))
        .route("/api/funds", get(funds::list_funds))
        .route("/api/funds/{scheme_code}", get(funds::fund_detail))
        .route("/api/funds/{scheme_code}/nav-history", get(funds::nav_history))
        .route(
            "/api/funds/{scheme_code}/calculator-data",
            get(funds::calculator_data),
        )
        .route("/api/categories", get(funds::list_categories))
        .route("/api/sync", post(funds::trigger_sync))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
            AppError::FundNotFound(_) | AppError::NoDataAvailable(_) | AppError::EmptySeries => {
                StatusCode::NOT_FOUND
            }
            AppError::UpstreamAuth(_) | AppError::UpstreamRequest { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        // Internal error details stay in the logs outside debug builds.
        let message = match &self {
            AppError::Internal(_) if !cfg!(debug_assertions) => "internal error".to_string(),
            _ => self.to_string(),
        };
        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}
