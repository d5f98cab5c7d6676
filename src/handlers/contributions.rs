//! Contribution Handler
//!
//! Appends a funding pledge to an idea and bumps funding_raised by exactly
//! the pledged amount, in one transaction. Contributions have no natural
//! uniqueness, so retries are only safe when the client sends an
//! Idempotency-Key; without one a retried request records a second pledge.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::error::AppError;
use crate::idempotency::{IdempotencyError, IdempotencyRepository};
use crate::models::{Contribution, Idea};

use super::ContributeCommand;

/// Outcome of a contribution request
pub enum ContributeOutcome {
    /// The pledge was recorded
    Fresh {
        idea: Idea,
        contribution: Contribution,
    },
    /// A completed request with the same idempotency key already exists;
    /// its stored response is replayed verbatim
    Replayed { body: serde_json::Value },
}

/// Handler for idea funding pledges
pub struct ContributionHandler {
    pool: PgPool,
    idempotency: IdempotencyRepository,
}

impl ContributionHandler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            idempotency: IdempotencyRepository::new(pool.clone()),
            pool,
        }
    }

    /// Record a pledge, optionally under an idempotency key.
    pub async fn contribute(
        &self,
        command: ContributeCommand,
        idempotency_key: Option<Uuid>,
    ) -> Result<ContributeOutcome, AppError> {
        if command.amount < 1 {
            return Err(DomainError::InvalidAmount(command.amount).into());
        }

        let Some(key) = idempotency_key else {
            let (idea, contribution) = self.execute(&command).await?;
            return Ok(ContributeOutcome::Fresh { idea, contribution });
        };

        let request_hash = IdempotencyRepository::compute_request_hash(
            &serde_json::to_vec(&command)
                .map_err(|e| AppError::Internal(format!("command serialization: {}", e)))?,
        );

        match self.idempotency.start_processing(key, &request_hash).await {
            Ok(None) => {}
            Ok(Some(existing)) => {
                return Ok(ContributeOutcome::Replayed {
                    body: existing
                        .response_body
                        .unwrap_or_else(|| serde_json::json!({})),
                });
            }
            Err(IdempotencyError::HashMismatch(_)) | Err(IdempotencyError::KeyInProgress) => {
                return Err(AppError::IdempotencyConflict);
            }
            Err(IdempotencyError::Database(e)) => return Err(e.into()),
            Err(e) => return Err(AppError::Internal(e.to_string())),
        }

        match self.execute(&command).await {
            Ok((idea, contribution)) => {
                let body = serde_json::json!({
                    "idea": &idea,
                    "contribution": &contribution,
                });
                if let Err(e) = self.idempotency.mark_completed(key, 200, body).await {
                    tracing::error!(key = %key, error = %e, "Failed to mark idempotency key completed");
                }
                Ok(ContributeOutcome::Fresh { idea, contribution })
            }
            Err(err) => {
                if let Err(e) = self.idempotency.mark_failed(key, None, None).await {
                    tracing::error!(key = %key, error = %e, "Failed to mark idempotency key failed");
                }
                Err(err)
            }
        }
    }

    /// Ledger append + counter bump, one transaction.
    async fn execute(&self, command: &ContributeCommand) -> Result<(Idea, Contribution), AppError> {
        let mut tx = self.pool.begin().await?;

        let idea: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT funding_raised
            FROM ideas
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(command.idea_id)
        .fetch_optional(&mut *tx)
        .await?;

        idea.ok_or(AppError::NotFound("Idea"))?;

        let contribution: Contribution = sqlx::query_as(
            r#"
            INSERT INTO contributions (id, idea_id, user_id, amount, message, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(command.idea_id)
        .bind(command.user_id)
        .bind(command.amount)
        .bind(&command.message)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE ideas
            SET funding_raised = funding_raised + $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(command.amount)
        .bind(command.idea_id)
        .execute(&mut *tx)
        .await?;

        let idea: Idea = sqlx::query_as("SELECT * FROM ideas WHERE id = $1")
            .bind(command.idea_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok((idea, contribution))
    }
}
