//! Membership Handler
//!
//! Join/leave operations for community groups. The membership row insert or
//! delete and the current_members adjustment run in one transaction that
//! locks the group row first, so the capacity check and the increment cannot
//! be separated by a concurrent join.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{guard, GroupRole};
use crate::error::AppError;
use crate::models::Group;

use super::{JoinGroupCommand, LeaveGroupCommand};

/// Handler for group membership mutations
pub struct MembershipHandler {
    pool: PgPool,
}

impl MembershipHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Join a group. Returns the refreshed group on success.
    pub async fn join(&self, command: JoinGroupCommand) -> Result<Group, AppError> {
        let mut tx = self.pool.begin().await?;

        let group: Option<(Option<i32>, i32)> = sqlx::query_as(
            r#"
            SELECT max_members, current_members
            FROM community_groups
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(command.group_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (max_members, current_members) = group.ok_or(AppError::NotFound("Group"))?;

        let already_member: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(command.group_id)
        .bind(command.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_member {
            return Err(AppError::AlreadyMember);
        }

        if guard::is_full(max_members, current_members) {
            return Err(AppError::CapacityExceeded("Group"));
        }

        // The unique (group_id, user_id) constraint backs up the guard for
        // requests racing outside this lock.
        sqlx::query(
            r#"
            INSERT INTO group_members (id, group_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(command.group_id)
        .bind(command.user_id)
        .bind(GroupRole::Member.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::AlreadyMember
            } else {
                AppError::Database(e)
            }
        })?;

        sqlx::query(
            r#"
            UPDATE community_groups
            SET current_members = current_members + 1, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(command.group_id)
        .execute(&mut *tx)
        .await?;

        let group: Group = sqlx::query_as("SELECT * FROM community_groups WHERE id = $1")
            .bind(command.group_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(group)
    }

    /// Leave a group. The group's creator may not leave.
    pub async fn leave(&self, command: LeaveGroupCommand) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let group: Option<(Uuid, i32)> = sqlx::query_as(
            r#"
            SELECT creator_id, current_members
            FROM community_groups
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(command.group_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (creator_id, current_members) = group.ok_or(AppError::NotFound("Group"))?;

        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(command.group_id)
        .bind(command.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if !is_member {
            return Err(AppError::NotAMember);
        }

        if creator_id == command.user_id {
            return Err(AppError::Forbidden("Creator cannot leave group"));
        }

        sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(command.group_id)
            .bind(command.user_id)
            .execute(&mut *tx)
            .await?;

        if current_members == 0 {
            // The counter should never be behind the ledger; the
            // reconciliation job is the corrective path.
            tracing::warn!(
                group_id = %command.group_id,
                "member counter already 0 before leave; counter drifted from ledger"
            );
        }

        sqlx::query(
            r#"
            UPDATE community_groups
            SET current_members = GREATEST(current_members - 1, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(command.group_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
