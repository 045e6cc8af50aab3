use super::{assignment_service::AssignmentService, distribution_engine::DistributionEngine};
use crate::domain::entities::{ChatAssignment, DistributionOutcome};
use crate::domain::ports::time_service::TimeService;
use crate::domain::services::window;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct InboundResult {
    pub assignment: ChatAssignment,
    /// `None` when the chat was already owned and no distribution was needed.
    pub outcome: Option<DistributionOutcome>,
}

/// Entry point for messaging webhooks: customer messages in, attendant replies out.
#[derive(Clone)]
pub struct ChatIntakeService {
    assignments: AssignmentService,
    engine: DistributionEngine,
    time_service: Arc<dyn TimeService>,
}

impl ChatIntakeService {
    pub fn new(
        assignments: AssignmentService,
        engine: DistributionEngine,
        time_service: Arc<dyn TimeService>,
    ) -> Self {
        Self {
            assignments,
            engine,
            time_service,
        }
    }

    pub async fn handle_inbound_message(
        &self,
        chat_id: &str,
        company_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> ApiResult<InboundResult> {
        let at = at.unwrap_or_else(|| self.time_service.now());
        let (mut assignment, created) = self
            .assignments
            .get_or_create(chat_id, company_id, at)
            .await?;

        if assignment.company_id != company_id {
            return Err(ApiError::Conflict(format!(
                "Chat {} belongs to another company",
                chat_id
            )));
        }

        if !created {
            if let Some(updated) = self.assignments.record_activity_at(chat_id, true, at).await? {
                assignment = updated;
            }
        }

        if !assignment.is_queued() {
            return Ok(InboundResult {
                assignment,
                outcome: None,
            });
        }

        let outcome = self.engine.distribute_chat(chat_id, company_id).await?;
        let assignment = self.assignments.get_by_chat_id(chat_id).await?.unwrap_or(assignment);

        Ok(InboundResult {
            assignment,
            outcome: Some(outcome),
        })
    }

    pub async fn handle_outbound_message(
        &self,
        chat_id: &str,
        at: Option<DateTime<Utc>>,
    ) -> ApiResult<ChatAssignment> {
        let at = at.unwrap_or_else(|| self.time_service.now());
        self.assignments
            .record_activity_at(chat_id, false, at)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Chat {} not found", chat_id)))
    }

    /// Whether a free-form reply is still allowed; otherwise callers must use a template.
    pub async fn can_send_free_form(&self, chat_id: &str, now: DateTime<Utc>) -> ApiResult<bool> {
        Ok(self
            .assignments
            .get_by_chat_id(chat_id)
            .await?
            .map(|a| window::is_within_window(&a, now))
            .unwrap_or(false))
    }
}
