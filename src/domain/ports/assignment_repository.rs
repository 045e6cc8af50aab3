use crate::domain::entities::{AssignmentHistory, AssignmentStatus, ChatAssignment};
use crate::infrastructure::http::middleware::error::ApiResult;
use chrono::{DateTime, Utc};

/// Store for chat assignments, keyed by `chat_id`.
#[async_trait::async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Insert-if-absent. Returns the stored row and whether this call created it.
    async fn get_or_create(
        &self,
        chat_id: &str,
        company_id: &str,
        customer_message_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> ApiResult<(ChatAssignment, bool)>;

    async fn get_by_chat_id(&self, chat_id: &str) -> ApiResult<Option<ChatAssignment>>;

    /// Compare-and-swap of the owner. Succeeds only when the row currently has
    /// `assigned_to == expected` and a non-terminal, non-expired status; sets
    /// `status = assigned` and `assigned_at = at`.
    async fn try_assign(
        &self,
        chat_id: &str,
        expected: Option<&str>,
        attendant_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<bool>;

    /// Customer message: advances the customer timestamp and window (never
    /// backwards) and reopens an expired chat. Returns the updated row.
    async fn record_customer_activity(
        &self,
        chat_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>>;

    /// Attendant message: advances the attendant timestamp and moves
    /// `assigned` to `active`. Never touches the window.
    async fn record_attendant_activity(
        &self,
        chat_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>>;

    /// Compare-and-swap into `resolved` from the given status and owner.
    async fn try_resolve(
        &self,
        chat_id: &str,
        expected_status: AssignmentStatus,
        expected_owner: Option<&str>,
        at: DateTime<Utc>,
    ) -> ApiResult<bool>;

    async fn list_by_attendant(
        &self,
        attendant_id: &str,
        company_id: &str,
    ) -> ApiResult<Vec<ChatAssignment>>;

    /// Queued chats, oldest customer message first.
    async fn list_unassigned(&self, company_id: &str) -> ApiResult<Vec<ChatAssignment>>;

    async fn count_unassigned(&self, company_id: &str) -> ApiResult<i64>;

    async fn count_by_status(&self, company_id: &str)
        -> ApiResult<Vec<(AssignmentStatus, i64)>>;

    /// Flag every non-resolved, non-expired chat whose window closed before `now`.
    /// Returns the flagged chat ids.
    async fn mark_expired(&self, company_id: &str, now: DateTime<Utc>) -> ApiResult<Vec<String>>;

    /// Open, owned chats where the customer spoke after the attendant and the
    /// attendant's last sign of life (reply or assignment) is older than `cutoff`.
    async fn list_stale(
        &self,
        company_id: &str,
        cutoff: DateTime<Utc>,
    ) -> ApiResult<Vec<ChatAssignment>>;

    async fn record_history(&self, history: &AssignmentHistory) -> ApiResult<()>;

    async fn list_history(&self, chat_id: &str) -> ApiResult<Vec<AssignmentHistory>>;
}
