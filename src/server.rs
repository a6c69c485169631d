//! HTTP Server - serves the mesh + evaluated field
//!
//! Endpoints:
//! - GET /api/grid     → { indices, vertices, evaluated }
//! - GET /api/health   → liveness probe

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    tracing::debug!("CORS layer configured: allow_origin=Any");

    let api = Router::new()
        .route("/grid", get(get_grid))
        .route("/health", get(health))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    tracing::info!("Initializing HTTP server on port {}", port);

    // Warm the cache so the first client does not wait on evaluation
    state.grid_payload().await?;

    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Starting server on http://localhost:{}", port);
    tracing::info!("  API: http://localhost:{}/api/grid", port);

    axum::serve(listener, app).await?;
    Ok(())
}

/// GET /api/grid
async fn get_grid(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    crate::log_request!("GET", "/api/grid");
    match state.grid_payload().await {
        Ok(payload) => {
            tracing::debug!(
                "Returning grid: {} vertices, field {}x{}",
                payload.vertices.len() / 3,
                payload.evaluated.width,
                payload.evaluated.height
            );
            Ok(Json((*payload).clone()))
        }
        Err(e) => {
            crate::log_error!(e, path = "/api/grid");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// GET /api/health
async fn health() -> impl IntoResponse {
    "ok"
}
