//! innohub - Community Innovation Hub Backend API
//!
//! REST backend for community groups, workshops, innovation ideas with
//! voting and crowdfunding, an NFT gallery, and a material-science
//! knowledge base. Denormalized counters are maintained transactionally
//! against their ledger tables.

use std::net::SocketAddr;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use innohub::ai::TextGenClient;
use innohub::jobs::JobScheduler;
use innohub::{api, db, AppState, Config};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "innohub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting innohub server");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    if config.ai_gateway_key.is_none() {
        tracing::warn!("AI gateway key not configured, AI endpoints will return errors");
    }

    let state = AppState {
        pool: pool.clone(),
        ai: TextGenClient::from_config(&config),
    };

    let scheduler = JobScheduler::new(pool.clone()).start();

    let app = api::create_router(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    scheduler.abort();
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
