//! HTTP API for the playoff bracket server.
//!
//! # Modules
//!
//! - [`brackets`]: bracket creation, score reporting, round advancement and queries
//! - [`error`]: mapping from bracket errors to JSON error responses
//! - [`request_id`]: request correlation IDs
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health
//! POST /api/v1/brackets
//! GET  /api/v1/brackets/{id}
//! GET  /api/v1/brackets/{id}/rounds/{round}/matchups
//! GET  /api/v1/brackets/{id}/rounds/{round}/matchups/{slot}
//! GET  /api/v1/brackets/{id}/rounds/{round}/competitors/{cid}/matchup
//! GET  /api/v1/brackets/{id}/rounds/{round}/standings
//! POST /api/v1/brackets/{id}/rounds/{round}/scores
//! POST /api/v1/brackets/{id}/rounds/{round}/advance
//! GET  /api/v1/brackets/{id}/competitors/{cid}/eliminated
//! ```
//!
//! All point values on the wire are integers in hundredths of a point, so a
//! score of `132.45` is sent as `13245`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ffl_bracket::bracket::BracketManager;
//! use ffl_bracket::db::InMemoryBracketRepository;
//! use ffl_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = BracketManager::new(Arc::new(InMemoryBracketRepository::new()));
//! let app = create_router(AppState::new(manager));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod brackets;
pub mod error;
pub mod request_id;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use ffl_bracket::bracket::BracketManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub bracket_manager: Arc<BracketManager>,
}

impl AppState {
    pub fn new(bracket_manager: BracketManager) -> Self {
        Self {
            bracket_manager: Arc::new(bracket_manager),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/brackets", post(brackets::initialize_bracket))
        .route("/brackets/{tournament_id}", get(brackets::get_bracket))
        .route(
            "/brackets/{tournament_id}/rounds/{round}/matchups",
            get(brackets::list_round_matchups),
        )
        .route(
            "/brackets/{tournament_id}/rounds/{round}/matchups/{slot}",
            get(brackets::get_matchup),
        )
        .route(
            "/brackets/{tournament_id}/rounds/{round}/competitors/{competitor_id}/matchup",
            get(brackets::get_competitor_matchup),
        )
        .route(
            "/brackets/{tournament_id}/rounds/{round}/standings",
            get(brackets::get_round_standings),
        )
        .route(
            "/brackets/{tournament_id}/rounds/{round}/scores",
            post(brackets::record_score),
        )
        .route(
            "/brackets/{tournament_id}/rounds/{round}/advance",
            post(brackets::advance_round),
        )
        .route(
            "/brackets/{tournament_id}/competitors/{competitor_id}/eliminated",
            get(brackets::is_eliminated),
        )
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the bracket store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":true,"version":"0.4.0","timestamp":"2026-01-04T18:00:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state.bracket_manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Bracket store health check failed");
            false
        }
    };

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
