use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use wadesk::domain::entities::{
    AssignmentHistory, AssignmentStatus, AttendantActivityLog, AttendantState, AttendantStatus,
    ChatAssignment,
};
use wadesk::domain::ports::assignment_repository::AssignmentRepository;
use wadesk::domain::ports::attendant_repository::AttendantRepository;
use wadesk::infrastructure::http::middleware::error::{ApiError, ApiResult};
use wadesk::infrastructure::persistence::Database;

/// Database-backed store that can be told to fail specific writes.
pub struct FaultyStore {
    db: Database,
    fail_assign: AtomicBool,
    fail_release: AtomicBool,
}

impl FaultyStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            fail_assign: AtomicBool::new(false),
            fail_release: AtomicBool::new(false),
        }
    }

    /// Every ownership commit returns a storage error.
    pub fn fail_assign(&self, fail: bool) {
        self.fail_assign.store(fail, Ordering::SeqCst);
    }

    /// Every load decrement returns a storage error.
    pub fn fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }
}

fn storage_down(operation: &str) -> ApiError {
    ApiError::Internal(format!("Storage failure: {} unavailable", operation))
}

#[async_trait]
impl AssignmentRepository for FaultyStore {
    async fn get_or_create(
        &self,
        chat_id: &str,
        company_id: &str,
        customer_message_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> ApiResult<(ChatAssignment, bool)> {
        AssignmentRepository::get_or_create(&self.db, chat_id, company_id, customer_message_at, at)
            .await
    }

    async fn get_by_chat_id(&self, chat_id: &str) -> ApiResult<Option<ChatAssignment>> {
        AssignmentRepository::get_by_chat_id(&self.db, chat_id).await
    }

    async fn try_assign(
        &self,
        chat_id: &str,
        expected: Option<&str>,
        attendant_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<bool> {
        if self.fail_assign.load(Ordering::SeqCst) {
            return Err(storage_down("try_assign"));
        }
        AssignmentRepository::try_assign(&self.db, chat_id, expected, attendant_id, at).await
    }

    async fn record_customer_activity(
        &self,
        chat_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>> {
        AssignmentRepository::record_customer_activity(&self.db, chat_id, at).await
    }

    async fn record_attendant_activity(
        &self,
        chat_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>> {
        AssignmentRepository::record_attendant_activity(&self.db, chat_id, at).await
    }

    async fn try_resolve(
        &self,
        chat_id: &str,
        expected_status: AssignmentStatus,
        expected_owner: Option<&str>,
        at: DateTime<Utc>,
    ) -> ApiResult<bool> {
        AssignmentRepository::try_resolve(&self.db, chat_id, expected_status, expected_owner, at)
            .await
    }

    async fn list_by_attendant(
        &self,
        attendant_id: &str,
        company_id: &str,
    ) -> ApiResult<Vec<ChatAssignment>> {
        AssignmentRepository::list_by_attendant(&self.db, attendant_id, company_id).await
    }

    async fn list_unassigned(&self, company_id: &str) -> ApiResult<Vec<ChatAssignment>> {
        AssignmentRepository::list_unassigned(&self.db, company_id).await
    }

    async fn count_unassigned(&self, company_id: &str) -> ApiResult<i64> {
        AssignmentRepository::count_unassigned(&self.db, company_id).await
    }

    async fn count_by_status(
        &self,
        company_id: &str,
    ) -> ApiResult<Vec<(AssignmentStatus, i64)>> {
        AssignmentRepository::count_by_status(&self.db, company_id).await
    }

    async fn mark_expired(&self, company_id: &str, now: DateTime<Utc>) -> ApiResult<Vec<String>> {
        AssignmentRepository::mark_expired(&self.db, company_id, now).await
    }

    async fn list_stale(
        &self,
        company_id: &str,
        cutoff: DateTime<Utc>,
    ) -> ApiResult<Vec<ChatAssignment>> {
        AssignmentRepository::list_stale(&self.db, company_id, cutoff).await
    }

    async fn record_history(&self, history: &AssignmentHistory) -> ApiResult<()> {
        AssignmentRepository::record_history(&self.db, history).await
    }

    async fn list_history(&self, chat_id: &str) -> ApiResult<Vec<AssignmentHistory>> {
        AssignmentRepository::list_history(&self.db, chat_id).await
    }
}

#[async_trait]
impl AttendantRepository for FaultyStore {
    async fn get_attendant(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> ApiResult<Option<AttendantStatus>> {
        AttendantRepository::get_attendant(&self.db, user_id, company_id).await
    }

    async fn upsert_status(
        &self,
        user_id: &str,
        company_id: &str,
        status: AttendantState,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        AttendantRepository::upsert_status(
            &self.db,
            user_id,
            company_id,
            status,
            default_max_chats,
            at,
        )
        .await
    }

    async fn upsert_max_chats(
        &self,
        user_id: &str,
        company_id: &str,
        max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        AttendantRepository::upsert_max_chats(&self.db, user_id, company_id, max_chats, at).await
    }

    async fn touch_activity(
        &self,
        user_id: &str,
        company_id: &str,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        AttendantRepository::touch_activity(&self.db, user_id, company_id, default_max_chats, at)
            .await
    }

    async fn adjust_load(
        &self,
        user_id: &str,
        company_id: &str,
        delta: i64,
        default_max_chats: i64,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        if delta < 0 && self.fail_release.load(Ordering::SeqCst) {
            return Err(storage_down("adjust_load"));
        }
        AttendantRepository::adjust_load(
            &self.db,
            user_id,
            company_id,
            delta,
            default_max_chats,
            at,
        )
        .await
    }

    async fn try_reserve_capacity(
        &self,
        user_id: &str,
        company_id: &str,
        at: DateTime<Utc>,
    ) -> ApiResult<bool> {
        AttendantRepository::try_reserve_capacity(&self.db, user_id, company_id, at).await
    }

    async fn list_by_company(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>> {
        AttendantRepository::list_by_company(&self.db, company_id).await
    }

    async fn list_eligible(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>> {
        AttendantRepository::list_eligible(&self.db, company_id).await
    }

    async fn count_by_status(&self, company_id: &str) -> ApiResult<Vec<(AttendantState, i64)>> {
        AttendantRepository::count_by_status(&self.db, company_id).await
    }

    async fn demote_inactive(
        &self,
        company_id: &str,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> ApiResult<Vec<AttendantStatus>> {
        AttendantRepository::demote_inactive(&self.db, company_id, cutoff, at).await
    }

    async fn create_activity_log(&self, log: &AttendantActivityLog) -> ApiResult<()> {
        AttendantRepository::create_activity_log(&self.db, log).await
    }

    async fn list_activity_logs(
        &self,
        user_id: &str,
        company_id: &str,
        limit: i64,
    ) -> ApiResult<Vec<AttendantActivityLog>> {
        AttendantRepository::list_activity_logs(&self.db, user_id, company_id, limit).await
    }
}
