//! Database module
//!
//! Database connection and schema verification utilities.

use sqlx::PgPool;

/// Check if required tables exist
/// Note: schema lives in raw SQL files under migrations/
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = vec![
        "users",
        "sessions",
        "nfts",
        "material_categories",
        "material_items",
        "ideas",
        "votes",
        "contributions",
        "community_groups",
        "group_members",
        "workshops",
        "workshop_attendees",
        "idempotency_keys",
    ];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
