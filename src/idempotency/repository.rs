//! Idempotency Repository
//!
//! Manages idempotency keys for contribution requests. A contribution is
//! append-only with no natural uniqueness, so a client retry after a timeout
//! would otherwise record the pledge twice; callers that send an
//! Idempotency-Key get the stored response replayed instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Idempotency key status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdempotencyStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<String> for IdempotencyStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => IdempotencyStatus::Pending,
            "processing" => IdempotencyStatus::Processing,
            "completed" => IdempotencyStatus::Completed,
            "failed" => IdempotencyStatus::Failed,
            _ => IdempotencyStatus::Pending,
        }
    }
}

impl std::fmt::Display for IdempotencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdempotencyStatus::Pending => write!(f, "pending"),
            IdempotencyStatus::Processing => write!(f, "processing"),
            IdempotencyStatus::Completed => write!(f, "completed"),
            IdempotencyStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Stored idempotency key information
#[derive(Debug, Clone)]
pub struct IdempotencyKey {
    pub key: Uuid,
    pub request_hash: String,
    pub response_status: Option<i32>,
    pub response_body: Option<serde_json::Value>,
    pub status: IdempotencyStatus,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Idempotency Repository Error
#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Key already exists and is being processed")]
    KeyInProgress,

    #[error("Request hash mismatch for key {0}")]
    HashMismatch(Uuid),

    #[error("Key not found: {0}")]
    NotFound(Uuid),
}

/// Repository for managing idempotency keys
#[derive(Debug, Clone)]
pub struct IdempotencyRepository {
    pool: PgPool,
}

impl IdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get an existing idempotency key
    pub async fn get(&self, key: Uuid) -> Result<Option<IdempotencyKey>, IdempotencyError> {
        let result: Option<(
            Uuid,
            String,
            Option<i32>,
            Option<serde_json::Value>,
            String,
            Option<DateTime<Utc>>,
            DateTime<Utc>,
            DateTime<Utc>,
        )> = sqlx::query_as(
            r#"
            SELECT
                key, request_hash, response_status, response_body,
                processing_status, processing_started_at, created_at, expires_at
            FROM idempotency_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result.map(
            |(key, request_hash, response_status, response_body, status, processing_started_at, created_at, expires_at)| {
                IdempotencyKey {
                    key,
                    request_hash,
                    response_status,
                    response_body,
                    status: IdempotencyStatus::from(status),
                    processing_started_at,
                    created_at,
                    expires_at,
                }
            },
        ))
    }

    /// Start processing a new idempotency key
    /// Returns Ok(None) if the key was claimed and the caller should execute
    /// the operation; Ok(Some(key)) if a completed record exists (caller
    /// replays its stored response); Err on hash mismatch or concurrent use.
    pub async fn start_processing(
        &self,
        key: Uuid,
        request_hash: &str,
    ) -> Result<Option<IdempotencyKey>, IdempotencyError> {
        if let Some(existing) = self.get(key).await? {
            if existing.request_hash != request_hash {
                return Err(IdempotencyError::HashMismatch(key));
            }

            if existing.status == IdempotencyStatus::Processing {
                // Treat keys stuck in processing for 5+ minutes as retryable
                if let Some(started) = existing.processing_started_at {
                    let duration = Utc::now() - started;
                    if duration.num_minutes() < 5 {
                        return Err(IdempotencyError::KeyInProgress);
                    }
                }
            }

            if existing.status == IdempotencyStatus::Completed {
                return Ok(Some(existing));
            }

            // Failed or stuck processing - reclaim
            sqlx::query(
                r#"
                UPDATE idempotency_keys
                SET processing_status = 'processing', processing_started_at = NOW()
                WHERE key = $1
                "#,
            )
            .bind(key)
            .execute(&self.pool)
            .await?;

            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO idempotency_keys (key, request_hash, processing_status, processing_started_at)
            VALUES ($1, $2, 'processing', NOW())
            "#,
        )
        .bind(key)
        .bind(request_hash)
        .execute(&self.pool)
        .await?;

        Ok(None)
    }

    /// Mark an idempotency key as completed with the response to replay
    pub async fn mark_completed(
        &self,
        key: Uuid,
        response_status: i32,
        response_body: serde_json::Value,
    ) -> Result<(), IdempotencyError> {
        let rows = sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET
                processing_status = 'completed',
                response_status = $2,
                response_body = $3
            WHERE key = $1
            "#,
        )
        .bind(key)
        .bind(response_status)
        .bind(response_body)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(IdempotencyError::NotFound(key));
        }

        Ok(())
    }

    /// Mark an idempotency key as failed
    pub async fn mark_failed(
        &self,
        key: Uuid,
        response_status: Option<i32>,
        response_body: Option<serde_json::Value>,
    ) -> Result<(), IdempotencyError> {
        let rows = sqlx::query(
            r#"
            UPDATE idempotency_keys
            SET
                processing_status = 'failed',
                response_status = $2,
                response_body = $3
            WHERE key = $1
            "#,
        )
        .bind(key)
        .bind(response_status)
        .bind(response_body)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(IdempotencyError::NotFound(key));
        }

        Ok(())
    }

    /// Delete expired idempotency keys
    pub async fn cleanup_expired(&self) -> Result<u64, IdempotencyError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM idempotency_keys
            WHERE expires_at < NOW()
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows)
    }

    /// Compute SHA-256 hash of request body for conflict detection
    pub fn compute_request_hash(body: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(body);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_status_from_string() {
        assert_eq!(
            IdempotencyStatus::from("pending".to_string()),
            IdempotencyStatus::Pending
        );
        assert_eq!(
            IdempotencyStatus::from("processing".to_string()),
            IdempotencyStatus::Processing
        );
        assert_eq!(
            IdempotencyStatus::from("completed".to_string()),
            IdempotencyStatus::Completed
        );
        assert_eq!(
            IdempotencyStatus::from("failed".to_string()),
            IdempotencyStatus::Failed
        );
        assert_eq!(
            IdempotencyStatus::from("unknown".to_string()),
            IdempotencyStatus::Pending
        );
    }

    #[test]
    fn test_idempotency_status_display() {
        assert_eq!(IdempotencyStatus::Pending.to_string(), "pending");
        assert_eq!(IdempotencyStatus::Processing.to_string(), "processing");
        assert_eq!(IdempotencyStatus::Completed.to_string(), "completed");
        assert_eq!(IdempotencyStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_compute_request_hash() {
        let body = b"{\"amount\": 40}";
        let hash = IdempotencyRepository::compute_request_hash(body);

        // SHA-256 as hex
        assert_eq!(hash.len(), 64);

        let hash2 = IdempotencyRepository::compute_request_hash(body);
        assert_eq!(hash, hash2);

        let hash3 = IdempotencyRepository::compute_request_hash(b"{\"amount\": 70}");
        assert_ne!(hash, hash3);
    }

    #[test]
    fn test_idempotency_error_display() {
        let err = IdempotencyError::KeyInProgress;
        assert!(err.to_string().contains("being processed"));

        let err = IdempotencyError::HashMismatch(Uuid::nil());
        assert!(err.to_string().contains("hash mismatch"));

        let err = IdempotencyError::NotFound(Uuid::nil());
        assert!(err.to_string().contains("not found"));
    }
}
