//! Vote Handler
//!
//! Upserts a user's vote on an idea. A replacement vote adjusts vote_count
//! by the delta between old and new value, never by re-adding the new value,
//! so retrying an identical vote leaves the count unchanged.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::VoteValue;
use crate::error::AppError;
use crate::models::Idea;

use super::VoteCommand;

/// Handler for idea votes
pub struct VoteHandler {
    pool: PgPool,
}

impl VoteHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cast or replace a vote. Returns the refreshed idea.
    pub async fn cast(&self, command: VoteCommand) -> Result<Idea, AppError> {
        let value = VoteValue::new(command.value)?;

        let mut tx = self.pool.begin().await?;

        let idea: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT vote_count
            FROM ideas
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(command.idea_id)
        .fetch_optional(&mut *tx)
        .await?;

        idea.ok_or(AppError::NotFound("Idea"))?;

        let existing: Option<(Uuid, i16)> = sqlx::query_as(
            "SELECT id, value FROM votes WHERE idea_id = $1 AND user_id = $2",
        )
        .bind(command.idea_id)
        .bind(command.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some((vote_id, old_value)) => {
                // Stored values satisfy the same CHECK as new ones
                let old = VoteValue::new(i64::from(old_value))?;
                let delta = value.delta_from(old);

                sqlx::query("UPDATE votes SET value = $1, created_at = NOW() WHERE id = $2")
                    .bind(value.value())
                    .bind(vote_id)
                    .execute(&mut *tx)
                    .await?;

                sqlx::query(
                    r#"
                    UPDATE ideas
                    SET vote_count = vote_count + $1, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(delta)
                .bind(command.idea_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (id, idea_id, user_id, value, created_at)
                    VALUES ($1, $2, $3, $4, NOW())
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(command.idea_id)
                .bind(command.user_id)
                .bind(value.value())
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    UPDATE ideas
                    SET vote_count = vote_count + $1, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(i32::from(value.value()))
                .bind(command.idea_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let idea: Idea = sqlx::query_as("SELECT * FROM ideas WHERE id = $1")
            .bind(command.idea_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(idea)
    }
}
