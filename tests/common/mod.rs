//! Common test utilities

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use innohub::ai::TextGenClient;
use innohub::{api, AppState};

/// Setup test database - truncate tables for a fresh state
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::query(
        r#"
        TRUNCATE TABLE
            group_members, community_groups,
            workshop_attendees, workshops,
            votes, contributions, ideas,
            nfts, material_items, material_categories,
            idempotency_keys, sessions, users
        CASCADE
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    pool
}

/// Seed a user with an active session. Returns the user id; the given token
/// authenticates as them via the X-Session-Token header.
pub async fn seed_user(pool: &PgPool, username: &str, token: &str) -> Uuid {
    let user_id = Uuid::new_v4();

    sqlx::query("INSERT INTO users (id, username, role, created_at) VALUES ($1, $2, 'user', NOW())")
        .bind(user_id)
        .bind(username)
        .execute(pool)
        .await
        .expect("Failed to seed user");

    // Hash in SQL so it matches what the auth middleware computes
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
        VALUES ($1, $2, encode(sha256($3::bytea), 'hex'), NOW(), NOW() + INTERVAL '1 hour')
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(token.as_bytes())
    .execute(pool)
    .await
    .expect("Failed to seed session");

    user_id
}

/// Build the application router against the test pool. The AI client is
/// left unconfigured; AI endpoints are not exercised here.
pub fn build_app(pool: PgPool) -> Router {
    let state = AppState {
        pool,
        ai: TextGenClient::new(
            "https://gateway.invalid/v1".to_string(),
            None,
            "test-model".to_string(),
        ),
    };
    api::create_router(state)
}
