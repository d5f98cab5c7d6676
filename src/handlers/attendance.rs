//! Attendance Handler
//!
//! Workshop register/unregister. Same transaction discipline as group
//! membership: the workshop row is locked before the capacity check so the
//! attendance insert and the counter increment form one atomic unit.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::guard;
use crate::error::AppError;
use crate::models::Workshop;

use super::{RegisterCommand, UnregisterCommand};

/// Handler for workshop attendance mutations
pub struct AttendanceHandler {
    pool: PgPool,
}

impl AttendanceHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register for a workshop. Returns the refreshed workshop on success.
    pub async fn register(&self, command: RegisterCommand) -> Result<Workshop, AppError> {
        let mut tx = self.pool.begin().await?;

        let workshop: Option<(Option<i32>, i32)> = sqlx::query_as(
            r#"
            SELECT max_attendees, current_attendees
            FROM workshops
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(command.workshop_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (max_attendees, current_attendees) = workshop.ok_or(AppError::NotFound("Workshop"))?;

        let already_registered: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM workshop_attendees WHERE workshop_id = $1 AND user_id = $2)",
        )
        .bind(command.workshop_id)
        .bind(command.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_registered {
            return Err(AppError::AlreadyRegistered);
        }

        if guard::is_full(max_attendees, current_attendees) {
            return Err(AppError::CapacityExceeded("Workshop"));
        }

        sqlx::query(
            r#"
            INSERT INTO workshop_attendees (id, workshop_id, user_id, status, registered_at)
            VALUES ($1, $2, $3, 'registered', NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(command.workshop_id)
        .bind(command.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::AlreadyRegistered
            } else {
                AppError::Database(e)
            }
        })?;

        sqlx::query(
            r#"
            UPDATE workshops
            SET current_attendees = current_attendees + 1
            WHERE id = $1
            "#,
        )
        .bind(command.workshop_id)
        .execute(&mut *tx)
        .await?;

        let workshop: Workshop = sqlx::query_as("SELECT * FROM workshops WHERE id = $1")
            .bind(command.workshop_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(workshop)
    }

    /// Cancel a workshop registration.
    pub async fn unregister(&self, command: UnregisterCommand) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let workshop: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT current_attendees
            FROM workshops
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(command.workshop_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (current_attendees,) = workshop.ok_or(AppError::NotFound("Workshop"))?;

        let deleted = sqlx::query(
            "DELETE FROM workshop_attendees WHERE workshop_id = $1 AND user_id = $2",
        )
        .bind(command.workshop_id)
        .bind(command.user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotRegistered);
        }

        if current_attendees == 0 {
            tracing::warn!(
                workshop_id = %command.workshop_id,
                "attendee counter already 0 before unregister; counter drifted from ledger"
            );
        }

        sqlx::query(
            r#"
            UPDATE workshops
            SET current_attendees = GREATEST(current_attendees - 1, 0)
            WHERE id = $1
            "#,
        )
        .bind(command.workshop_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
