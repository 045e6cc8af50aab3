use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Clock seam so window and staleness decisions can be driven from tests.
#[async_trait]
pub trait TimeService: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}
