//! API module
//!
//! Route modules per aggregate, session-auth middleware, and router
//! assembly. Everything under /api requires a valid session; /health does
//! not.

pub mod groups;
pub mod ideas;
pub mod materials;
pub mod middleware;
pub mod nfts;
pub mod workshops;

use axum::extract::FromRequest;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejection is the standard error body (400)
/// instead of axum's default 422 plain text.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Body for mutations whose only payload is an acknowledgement
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/groups", groups::router())
        .nest("/workshops", workshops::router())
        .nest("/ideas", ideas::router())
        .nest("/nfts", nfts::router())
        .nest("/materials", materials::router())
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok" })),
    )
}
