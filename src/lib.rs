//! innohub Library
//!
//! Re-exports modules for integration testing and external use.

pub mod ai;
pub mod api;
pub mod domain;
pub mod handlers;
pub mod idempotency;
pub mod jobs;
pub mod models;
pub mod state;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
