use crate::domain::entities::{AttendantActivityLog, AttendantState, AttendantStatus};
use crate::infrastructure::http::middleware::error::ApiResult;
use chrono::{DateTime, Utc};

/// Store for attendant availability and load.
///
/// Every write upserts on `(user_id, company_id)`; rows missing at write time are
/// created with `default_max_chats`. `active_chats` is only ever changed by
/// in-store arithmetic, never by writing back a value read earlier.
#[async_trait::async_trait]
pub trait AttendantRepository: Send + Sync {
    async fn get_attendant(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> ApiResult<Option<AttendantStatus>>;

    /// Set status and bump `last_activity_at`.
    async fn upsert_status(
        &self,
        user_id: &str,
        company_id: &str,
        status: AttendantState,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()>;

    /// Set capacity; new rows start `offline`.
    async fn upsert_max_chats(
        &self,
        user_id: &str,
        company_id: &str,
        max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()>;

    /// Bump `last_activity_at` only; new rows start `available`.
    async fn touch_activity(
        &self,
        user_id: &str,
        company_id: &str,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()>;

    /// Atomically add `delta` to `active_chats`, clamped at zero.
    async fn adjust_load(
        &self,
        user_id: &str,
        company_id: &str,
        delta: i64,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()>;

    /// Conditional increment: succeeds only while the attendant is available
    /// and below capacity. Returns whether the slot was reserved.
    async fn try_reserve_capacity(
        &self,
        user_id: &str,
        company_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<bool>;

    async fn list_by_company(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>>;

    /// Available attendants with `active_chats < max_chats`.
    async fn list_eligible(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>>;

    async fn count_by_status(&self, company_id: &str) -> ApiResult<Vec<(AttendantState, i64)>>;

    /// Force `offline` on every non-offline attendant whose last activity is
    /// older than `cutoff`. Returns the rows as they were before demotion.
    async fn demote_inactive(
        &self,
        company_id: &str,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> ApiResult<Vec<AttendantStatus>>;

    async fn create_activity_log(&self, log: &AttendantActivityLog) -> ApiResult<()>;

    async fn list_activity_logs(
        &self,
        user_id: &str,
        company_id: &str,
        limit: i64,
    ) -> ApiResult<Vec<AttendantActivityLog>>;
}
