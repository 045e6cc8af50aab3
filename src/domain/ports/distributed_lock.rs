use crate::infrastructure::http::middleware::error::ApiResult;
use async_trait::async_trait;

/// Cross-process mutual exclusion for scheduled jobs.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Take the lock unless another owner holds an unexpired lease on it.
    async fn acquire(&self, key: &str, owner: &str, ttl_seconds: u64) -> ApiResult<bool>;

    /// Release the lock if it is held by the given owner.
    async fn release(&self, key: &str, owner: &str) -> ApiResult<()>;
}
