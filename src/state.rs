//! Application state
//!
//! Shared state handed to the router: the database pool and the
//! text-generation client.

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::ai::TextGenClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub ai: TextGenClient,
}

impl AppState {
    pub fn new(pool: PgPool, ai: TextGenClient) -> Self {
        Self { pool, ai }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}

impl FromRef<AppState> for TextGenClient {
    fn from_ref(state: &AppState) -> TextGenClient {
        state.ai.clone()
    }
}
