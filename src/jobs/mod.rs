//! Scheduled Jobs
//!
//! Periodic maintenance: counter reconciliation against the ledger tables,
//! idempotency key housekeeping, and expired session cleanup. The mutation
//! path keeps counters exact; reconciliation exists to detect and repair
//! drift introduced outside the API (manual SQL, restores, bugs).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

use crate::idempotency::{IdempotencyError, IdempotencyRepository};

// =========================================================================
// Counter Reconciliation Jobs
// =========================================================================

/// Recompute current_members from group_members and repair drifted rows.
/// Returns the number of rows corrected.
pub async fn reconcile_group_members(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        WITH actual AS (
            SELECT g.id, COUNT(m.id)::int AS n
            FROM community_groups g
            LEFT JOIN group_members m ON m.group_id = g.id
            GROUP BY g.id
        )
        UPDATE community_groups g
        SET current_members = actual.n, updated_at = NOW()
        FROM actual
        WHERE actual.id = g.id AND g.current_members <> actual.n
        "#,
    )
    .execute(pool)
    .await?;

    let rows_corrected = result.rows_affected();

    if rows_corrected > 0 {
        tracing::warn!(
            rows_corrected = rows_corrected,
            "Repaired drifted current_members counters"
        );
    }

    Ok(rows_corrected)
}

/// Recompute current_attendees from workshop_attendees.
pub async fn reconcile_workshop_attendees(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        WITH actual AS (
            SELECT w.id, COUNT(a.id)::int AS n
            FROM workshops w
            LEFT JOIN workshop_attendees a ON a.workshop_id = w.id
            GROUP BY w.id
        )
        UPDATE workshops w
        SET current_attendees = actual.n
        FROM actual
        WHERE actual.id = w.id AND w.current_attendees <> actual.n
        "#,
    )
    .execute(pool)
    .await?;

    let rows_corrected = result.rows_affected();

    if rows_corrected > 0 {
        tracing::warn!(
            rows_corrected = rows_corrected,
            "Repaired drifted current_attendees counters"
        );
    }

    Ok(rows_corrected)
}

/// Recompute vote_count as the sum of vote values per idea.
pub async fn reconcile_vote_counts(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        WITH actual AS (
            SELECT i.id, COALESCE(SUM(v.value), 0)::int AS n
            FROM ideas i
            LEFT JOIN votes v ON v.idea_id = i.id
            GROUP BY i.id
        )
        UPDATE ideas i
        SET vote_count = actual.n, updated_at = NOW()
        FROM actual
        WHERE actual.id = i.id AND i.vote_count <> actual.n
        "#,
    )
    .execute(pool)
    .await?;

    let rows_corrected = result.rows_affected();

    if rows_corrected > 0 {
        tracing::warn!(
            rows_corrected = rows_corrected,
            "Repaired drifted vote_count counters"
        );
    }

    Ok(rows_corrected)
}

/// Recompute funding_raised as the sum of contribution amounts per idea.
pub async fn reconcile_funding_raised(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        WITH actual AS (
            SELECT i.id, COALESCE(SUM(c.amount), 0)::bigint AS n
            FROM ideas i
            LEFT JOIN contributions c ON c.idea_id = i.id
            GROUP BY i.id
        )
        UPDATE ideas i
        SET funding_raised = actual.n, updated_at = NOW()
        FROM actual
        WHERE actual.id = i.id AND i.funding_raised <> actual.n
        "#,
    )
    .execute(pool)
    .await?;

    let rows_corrected = result.rows_affected();

    if rows_corrected > 0 {
        tracing::warn!(
            rows_corrected = rows_corrected,
            "Repaired drifted funding_raised counters"
        );
    }

    Ok(rows_corrected)
}

// =========================================================================
// Idempotency Key Maintenance Jobs
// =========================================================================

/// Reset idempotency keys stuck in 'processing' for more than 5 minutes so
/// the request can be retried.
pub async fn reset_stale_idempotency_keys(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        UPDATE idempotency_keys
        SET processing_status = 'failed'
        WHERE processing_status = 'processing'
          AND processing_started_at < NOW() - INTERVAL '5 minutes'
        "#,
    )
    .execute(pool)
    .await?;

    let rows_affected = result.rows_affected();

    if rows_affected > 0 {
        tracing::warn!(
            rows_affected = rows_affected,
            "Reset stale processing idempotency keys"
        );
    }

    Ok(rows_affected)
}

/// Delete idempotency keys past their expiration time (default 24 hours).
pub async fn delete_expired_idempotency_keys(pool: &PgPool) -> Result<u64, JobError> {
    let rows_deleted = IdempotencyRepository::new(pool.clone())
        .cleanup_expired()
        .await?;

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            "Deleted expired idempotency keys"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Session Cleanup Job
// =========================================================================

/// Delete expired sessions. Auth already rejects them; this keeps the
/// table from growing without bound.
pub async fn delete_expired_sessions(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        DELETE FROM sessions
        WHERE expires_at < NOW()
        "#,
    )
    .execute(pool)
    .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(rows_deleted = rows_deleted, "Deleted expired sessions");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for idempotency key maintenance (default: 1 minute)
    pub idempotency_maintenance_interval: Duration,
    /// Interval for session cleanup (default: 10 minutes)
    pub session_cleanup_interval: Duration,
    /// Interval for counter reconciliation (default: 1 hour)
    pub reconciliation_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            idempotency_maintenance_interval: Duration::from_secs(60),
            session_cleanup_interval: Duration::from_secs(600),
            reconciliation_interval: Duration::from_secs(3600),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut idempotency_interval = interval(self.config.idempotency_maintenance_interval);
        let mut session_interval = interval(self.config.session_cleanup_interval);
        let mut reconciliation_interval = interval(self.config.reconciliation_interval);

        loop {
            tokio::select! {
                _ = idempotency_interval.tick() => {
                    if let Err(e) = reset_stale_idempotency_keys(&self.pool).await {
                        tracing::error!(error = %e, "Idempotency key reset failed");
                    }
                    if let Err(e) = delete_expired_idempotency_keys(&self.pool).await {
                        tracing::error!(error = %e, "Idempotency key deletion failed");
                    }
                }
                _ = session_interval.tick() => {
                    if let Err(e) = delete_expired_sessions(&self.pool).await {
                        tracing::error!(error = %e, "Session cleanup failed");
                    }
                }
                _ = reconciliation_interval.tick() => {
                    if let Err(e) = self.reconcile_all().await {
                        tracing::error!(error = %e, "Counter reconciliation failed");
                    }
                }
            }
        }
    }

    async fn reconcile_all(&self) -> Result<(), JobError> {
        reconcile_group_members(&self.pool).await?;
        reconcile_workshop_attendees(&self.pool).await?;
        reconcile_vote_counts(&self.pool).await?;
        reconcile_funding_raised(&self.pool).await?;
        Ok(())
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match reconcile_group_members(&self.pool).await {
            Ok(count) => report.member_counters_corrected = count,
            Err(e) => report.errors.push(format!("Member reconciliation: {}", e)),
        }

        match reconcile_workshop_attendees(&self.pool).await {
            Ok(count) => report.attendee_counters_corrected = count,
            Err(e) => report.errors.push(format!("Attendee reconciliation: {}", e)),
        }

        match reconcile_vote_counts(&self.pool).await {
            Ok(count) => report.vote_counters_corrected = count,
            Err(e) => report.errors.push(format!("Vote reconciliation: {}", e)),
        }

        match reconcile_funding_raised(&self.pool).await {
            Ok(count) => report.funding_counters_corrected = count,
            Err(e) => report.errors.push(format!("Funding reconciliation: {}", e)),
        }

        match reset_stale_idempotency_keys(&self.pool).await {
            Ok(count) => report.idempotency_keys_reset = count,
            Err(e) => report.errors.push(format!("Idempotency reset: {}", e)),
        }

        match delete_expired_idempotency_keys(&self.pool).await {
            Ok(count) => report.idempotency_keys_deleted = count,
            Err(e) => report.errors.push(format!("Idempotency deletion: {}", e)),
        }

        match delete_expired_sessions(&self.pool).await {
            Ok(count) => report.sessions_deleted = count,
            Err(e) => report.errors.push(format!("Session cleanup: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub member_counters_corrected: u64,
    pub attendee_counters_corrected: u64,
    pub vote_counters_corrected: u64,
    pub funding_counters_corrected: u64,
    pub idempotency_keys_reset: u64,
    pub idempotency_keys_deleted: u64,
    pub sessions_deleted: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl MaintenanceReport {
    /// True when any counter needed repair.
    pub fn had_drift(&self) -> bool {
        self.member_counters_corrected > 0
            || self.attendee_counters_corrected > 0
            || self.vote_counters_corrected > 0
            || self.funding_counters_corrected > 0
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Idempotency maintenance error: {0}")]
    Idempotency(#[from] IdempotencyError),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_scheduler_config_default() {
        let config = JobSchedulerConfig::default();
        assert_eq!(config.idempotency_maintenance_interval, Duration::from_secs(60));
        assert_eq!(config.session_cleanup_interval, Duration::from_secs(600));
        assert_eq!(config.reconciliation_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_maintenance_report_default() {
        let report = MaintenanceReport::default();
        assert_eq!(report.idempotency_keys_deleted, 0);
        assert!(report.errors.is_empty());
        assert!(!report.had_drift());
    }

    #[test]
    fn test_had_drift() {
        let report = MaintenanceReport {
            vote_counters_corrected: 2,
            ..Default::default()
        };
        assert!(report.had_drift());
    }
}
