use crate::domain::ports::{distributed_lock::DistributedLock, time_service::TimeService};
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::infrastructure::persistence::Database;
use crate::shared::utils::format_timestamp;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

/// Lease-based lock on the `distributed_locks` table. Lease times come from the
/// injected clock.
#[derive(Clone)]
pub struct DatabaseDistributedLock {
    db: Database,
    time_service: Arc<dyn TimeService>,
}

impl DatabaseDistributedLock {
    pub fn new(db: Database, time_service: Arc<dyn TimeService>) -> Self {
        Self { db, time_service }
    }
}

#[async_trait]
impl DistributedLock for DatabaseDistributedLock {
    async fn acquire(&self, key: &str, owner: &str, ttl_seconds: u64) -> ApiResult<bool> {
        let now = self.time_service.now();
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                ApiError::BadRequest(format!("Lock TTL out of range: {}s", ttl_seconds))
            })?;

        // Insert, or take over a lease whose holder let it lapse.
        let result = sqlx::query(
            "INSERT INTO distributed_locks (key, owner, expires_at, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                owner = excluded.owner,
                expires_at = excluded.expires_at,
                created_at = excluded.created_at
             WHERE distributed_locks.expires_at < ?",
        )
        .bind(key)
        .bind(owner)
        .bind(format_timestamp(expires_at))
        .bind(format_timestamp(now))
        .bind(format_timestamp(now))
        .execute(&self.db.pool)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to acquire lock: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self, key: &str, owner: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM distributed_locks WHERE key = ? AND owner = ?")
            .bind(key)
            .bind(owner)
            .execute(&self.db.pool)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to release lock: {}", e)))?;
        Ok(())
    }
}
