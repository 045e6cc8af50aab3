use super::distribution_engine::DistributionEngine;
use crate::domain::entities::{
    AssignmentHistory, AssignmentReason, AssignmentStatus, ChatAssignment,
};
use crate::domain::events::SystemEvent;
use crate::domain::ports::{
    assignment_repository::AssignmentRepository, attendant_repository::AttendantRepository,
    event_bus::EventBus, time_service::TimeService,
};
use crate::domain::services::window;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::shared::utils::format_timestamp;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Lost resolve races are retried against the fresh row this many times.
const RESOLVE_ATTEMPTS: usize = 3;

/// Chat to attendant bindings and their lifecycle transitions.
#[derive(Clone)]
pub struct AssignmentService {
    assignment_repo: Arc<dyn AssignmentRepository>,
    attendant_repo: Arc<dyn AttendantRepository>,
    engine: DistributionEngine,
    event_bus: Arc<dyn EventBus>,
    time_service: Arc<dyn TimeService>,
    default_max_chats: i64,
}

impl AssignmentService {
    pub fn new(
        assignment_repo: Arc<dyn AssignmentRepository>,
        attendant_repo: Arc<dyn AttendantRepository>,
        engine: DistributionEngine,
        event_bus: Arc<dyn EventBus>,
        time_service: Arc<dyn TimeService>,
        default_max_chats: i64,
    ) -> Self {
        Self {
            assignment_repo,
            attendant_repo,
            engine,
            event_bus,
            time_service,
            default_max_chats,
        }
    }

    /// Returns the existing record untouched, or creates a queued one.
    pub async fn get_or_create(
        &self,
        chat_id: &str,
        company_id: &str,
        customer_message_at: DateTime<Utc>,
    ) -> ApiResult<(ChatAssignment, bool)> {
        let (assignment, created) = self
            .assignment_repo
            .get_or_create(
                chat_id,
                company_id,
                customer_message_at,
                self.time_service.now(),
            )
            .await?;

        if created {
            tracing::info!("Chat {} queued for company {}", chat_id, company_id);
            let _ = self.event_bus.publish(SystemEvent::ChatQueued {
                chat_id: chat_id.to_string(),
                company_id: company_id.to_string(),
                timestamp: format_timestamp(self.time_service.now()),
            });
        }

        Ok((assignment, created))
    }

    /// Bind a queued chat to an attendant whose capacity the caller already reserved.
    ///
    /// Returns false when the chat is no longer queued.
    pub async fn assign(&self, chat_id: &str, attendant_id: &str) -> ApiResult<bool> {
        self.assignment_repo
            .try_assign(chat_id, None, attendant_id, self.time_service.now())
            .await
    }

    pub async fn record_activity(
        &self,
        chat_id: &str,
        from_customer: bool,
    ) -> ApiResult<Option<ChatAssignment>> {
        self.record_activity_at(chat_id, from_customer, self.time_service.now())
            .await
    }

    /// Record a message at `at`. Timestamps never move backwards, so late or
    /// redelivered messages cannot shrink the window.
    pub async fn record_activity_at(
        &self,
        chat_id: &str,
        from_customer: bool,
        at: DateTime<Utc>,
    ) -> ApiResult<Option<ChatAssignment>> {
        if !from_customer {
            return self
                .assignment_repo
                .record_attendant_activity(chat_id, at)
                .await;
        }

        let before = self.assignment_repo.get_by_chat_id(chat_id).await?;
        let updated = self
            .assignment_repo
            .record_customer_activity(chat_id, at)
            .await?;

        if let (Some(before), Some(after)) = (&before, &updated) {
            if before.status == AssignmentStatus::Expired && after.status != AssignmentStatus::Expired
            {
                tracing::info!(
                    "Chat {} reopened by customer as {} until {}",
                    chat_id,
                    after.status,
                    after.window_expires_at
                );
                let _ = self.event_bus.publish(SystemEvent::ChatReopened {
                    chat_id: chat_id.to_string(),
                    company_id: after.company_id.clone(),
                    timestamp: format_timestamp(at),
                });
            }
        }

        Ok(updated)
    }

    pub async fn get_by_chat_id(&self, chat_id: &str) -> ApiResult<Option<ChatAssignment>> {
        self.assignment_repo.get_by_chat_id(chat_id).await
    }

    pub async fn list_by_attendant(
        &self,
        attendant_id: &str,
        company_id: &str,
    ) -> ApiResult<Vec<ChatAssignment>> {
        self.assignment_repo
            .list_by_attendant(attendant_id, company_id)
            .await
    }

    pub async fn list_unassigned(&self, company_id: &str) -> ApiResult<Vec<ChatAssignment>> {
        self.assignment_repo.list_unassigned(company_id).await
    }

    /// Flag chats whose messaging window has closed. Owners keep them and their load.
    pub async fn mark_expired(&self, company_id: &str) -> ApiResult<u64> {
        let now = self.time_service.now();
        let expired = self.assignment_repo.mark_expired(company_id, now).await?;

        for chat_id in &expired {
            let _ = self.event_bus.publish(SystemEvent::ChatExpired {
                chat_id: chat_id.clone(),
                company_id: company_id.to_string(),
                timestamp: format_timestamp(now),
            });
        }

        if !expired.is_empty() {
            metrics::counter!("wadesk_chats_expired_total").increment(expired.len() as u64);
            tracing::info!(
                "Expired {} chats in company {}",
                expired.len(),
                company_id
            );
        }

        Ok(expired.len() as u64)
    }

    /// Move chats away from attendants who left a waiting customer unanswered
    /// for `stale_hours`. Expired chats are never candidates.
    pub async fn reassign_stale(&self, company_id: &str, stale_hours: i64) -> ApiResult<u64> {
        let now = self.time_service.now();
        let threshold = window::hours_threshold(stale_hours)?;
        let cutoff = window::cutoff_before(now, threshold)?;
        let candidates = self.assignment_repo.list_stale(company_id, cutoff).await?;

        let mut reassigned = 0;
        for assignment in candidates
            .iter()
            .filter(|a| window::is_stale(a, now, threshold))
        {
            // One chat failing must not hold back the rest of the company.
            match self.engine.reassign(assignment).await {
                Ok(Some(_)) => reassigned += 1,
                Ok(None) => {}
                Err(e) => tracing::error!(
                    "Failed to reassign stale chat {} in company {}: {}",
                    assignment.chat_id,
                    company_id,
                    e
                ),
            }
        }

        if reassigned > 0 {
            tracing::info!(
                "Reassigned {} stale chats in company {}",
                reassigned,
                company_id
            );
        }

        Ok(reassigned)
    }

    /// Close a chat and release its owner's slot exactly once.
    ///
    /// Resolving an already resolved chat returns it unchanged.
    pub async fn resolve(&self, chat_id: &str) -> ApiResult<ChatAssignment> {
        for _ in 0..RESOLVE_ATTEMPTS {
            let current = self.require(chat_id).await?;
            if current.status == AssignmentStatus::Resolved {
                return Ok(current);
            }

            let now = self.time_service.now();
            let owner = current.assigned_to.as_deref();
            if !self
                .assignment_repo
                .try_resolve(chat_id, current.status, owner, now)
                .await?
            {
                tracing::debug!("Chat {} changed while resolving; retrying", chat_id);
                continue;
            }

            let holds_load = matches!(
                current.status,
                AssignmentStatus::Assigned | AssignmentStatus::Active | AssignmentStatus::Expired
            );
            if let (Some(owner), true) = (owner, holds_load) {
                self.attendant_repo
                    .adjust_load(owner, &current.company_id, -1, self.default_max_chats, now)
                    .await?;
            }

            let history = AssignmentHistory::new(
                current.chat_id.clone(),
                current.company_id.clone(),
                current.assigned_to.clone(),
                None,
                AssignmentReason::Resolved,
                now,
            );
            if let Err(e) = self.assignment_repo.record_history(&history).await {
                tracing::warn!("Failed to record resolve history for chat {}: {}", chat_id, e);
            }

            let _ = self.event_bus.publish(SystemEvent::ChatResolved {
                chat_id: chat_id.to_string(),
                company_id: current.company_id.clone(),
                attendant_id: current.assigned_to.clone(),
                timestamp: format_timestamp(now),
            });
            tracing::info!("Chat {} resolved", chat_id);

            return self.require(chat_id).await;
        }

        Err(ApiError::Conflict(format!(
            "Chat {} kept changing while resolving, retry",
            chat_id
        )))
    }

    /// `None` for an unknown chat.
    pub async fn is_within_window(
        &self,
        chat_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<bool>> {
        Ok(self
            .assignment_repo
            .get_by_chat_id(chat_id)
            .await?
            .map(|a| window::is_within_window(&a, now)))
    }

    pub async fn list_history(&self, chat_id: &str) -> ApiResult<Vec<AssignmentHistory>> {
        self.assignment_repo.list_history(chat_id).await
    }

    async fn require(&self, chat_id: &str) -> ApiResult<ChatAssignment> {
        self.assignment_repo
            .get_by_chat_id(chat_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Chat {} not found", chat_id)))
    }
}
