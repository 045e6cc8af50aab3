use crate::domain::entities::{
    AssignmentHistory, AssignmentReason, AssignmentStatus, ChatAssignment, DistributionOutcome,
    DistributionStrategy,
};
use crate::domain::events::SystemEvent;
use crate::domain::ports::{
    assignment_repository::AssignmentRepository, attendant_repository::AttendantRepository,
    company_repository::CompanyRepository, event_bus::EventBus, time_service::TimeService,
};
use crate::domain::services::select_attendant;
use crate::infrastructure::http::middleware::error::ApiResult;
use crate::shared::utils::format_timestamp;
use std::collections::HashSet;
use std::sync::Arc;

/// Picks attendants for chats and commits the choice.
///
/// Capacity is reserved first with a conditional increment, then ownership is
/// committed with a compare-and-swap on the chat row. Whichever step loses a
/// race undoes the reservation, so a slot is never held without a chat and a
/// chat never lands on an attendant who had no slot.
#[derive(Clone)]
pub struct DistributionEngine {
    attendant_repo: Arc<dyn AttendantRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    company_repo: Arc<dyn CompanyRepository>,
    event_bus: Arc<dyn EventBus>,
    time_service: Arc<dyn TimeService>,
    max_attempts: u32,
    default_max_chats: i64,
}

impl DistributionEngine {
    pub fn new(
        attendant_repo: Arc<dyn AttendantRepository>,
        assignment_repo: Arc<dyn AssignmentRepository>,
        company_repo: Arc<dyn CompanyRepository>,
        event_bus: Arc<dyn EventBus>,
        time_service: Arc<dyn TimeService>,
        max_attempts: u32,
        default_max_chats: i64,
    ) -> Self {
        Self {
            attendant_repo,
            assignment_repo,
            company_repo,
            event_bus,
            time_service,
            max_attempts: max_attempts.max(1),
            default_max_chats,
        }
    }

    pub async fn strategy_for(&self, company_id: &str) -> ApiResult<DistributionStrategy> {
        Ok(self
            .company_repo
            .get_settings(company_id)
            .await?
            .map(|s| s.strategy)
            .unwrap_or_default())
    }

    pub async fn distribute_chat(
        &self,
        chat_id: &str,
        company_id: &str,
    ) -> ApiResult<DistributionOutcome> {
        let Some(assignment) = self.assignment_repo.get_by_chat_id(chat_id).await? else {
            tracing::warn!("Distribution requested for unknown chat {}", chat_id);
            return Ok(DistributionOutcome::NotDistributable);
        };

        if assignment.company_id != company_id {
            tracing::warn!(
                "Chat {} belongs to company {}, not {}; refusing to distribute",
                chat_id,
                assignment.company_id,
                company_id
            );
            return Ok(DistributionOutcome::NotDistributable);
        }

        if let Some(owner) = &assignment.assigned_to {
            if assignment.status.is_open() {
                return Ok(DistributionOutcome::AlreadyAssigned {
                    attendant_id: owner.clone(),
                });
            }
        }

        if !assignment.is_queued() {
            return Ok(DistributionOutcome::NotDistributable);
        }

        let strategy = self.strategy_for(company_id).await?;
        let mut excluded = HashSet::new();

        for attempt in 1..=self.max_attempts {
            let candidates = self.attendant_repo.list_eligible(company_id).await?;
            let Some(chosen) = select_attendant(&candidates, strategy, &excluded) else {
                break;
            };
            let attendant_id = chosen.user_id.clone();
            let now = self.time_service.now();

            if !self
                .attendant_repo
                .try_reserve_capacity(&attendant_id, company_id, now)
                .await?
            {
                // Filled up (or went unavailable) between the read and the reservation.
                metrics::counter!("wadesk_capacity_races_total").increment(1);
                tracing::debug!(
                    "Capacity race lost on attendant {} for chat {} (attempt {}/{})",
                    attendant_id,
                    chat_id,
                    attempt,
                    self.max_attempts
                );
                excluded.insert(attendant_id);
                continue;
            }

            let committed = match self
                .assignment_repo
                .try_assign(chat_id, None, &attendant_id, now)
                .await
            {
                Ok(committed) => committed,
                Err(e) => {
                    self.release_slot(&attendant_id, company_id).await;
                    return Err(e);
                }
            };

            if !committed {
                // A concurrent distribution of the same chat got there first.
                self.release_slot(&attendant_id, company_id).await;
                return self.outcome_after_lost_commit(chat_id).await;
            }

            self.record_history(
                &assignment,
                None,
                Some(&attendant_id),
                AssignmentReason::Distributed,
            )
            .await;
            let _ = self.event_bus.publish(SystemEvent::ChatAssigned {
                chat_id: chat_id.to_string(),
                company_id: company_id.to_string(),
                attendant_id: attendant_id.clone(),
                timestamp: format_timestamp(now),
            });
            metrics::counter!("wadesk_chats_distributed_total").increment(1);
            tracing::info!(
                "Chat {} assigned to attendant {} ({})",
                chat_id,
                attendant_id,
                strategy
            );

            return Ok(DistributionOutcome::Assigned { attendant_id });
        }

        metrics::counter!("wadesk_distribution_no_capacity_total").increment(1);
        tracing::info!(
            "No attendant available for chat {} in company {}; chat stays queued",
            chat_id,
            company_id
        );
        Ok(DistributionOutcome::NoAttendantAvailable)
    }

    /// Move a stale chat from its silent owner to another eligible attendant.
    ///
    /// Returns the new owner, or `None` when nobody else can take it or the chat
    /// changed hands while we were choosing.
    pub async fn reassign(&self, assignment: &ChatAssignment) -> ApiResult<Option<String>> {
        let Some(previous) = assignment.assigned_to.clone() else {
            return Ok(None);
        };
        let company_id = assignment.company_id.as_str();
        let chat_id = assignment.chat_id.as_str();

        let strategy = self.strategy_for(company_id).await?;
        let mut excluded: HashSet<String> = [previous.clone()].into_iter().collect();

        for _ in 0..self.max_attempts {
            let candidates = self.attendant_repo.list_eligible(company_id).await?;
            let Some(chosen) = select_attendant(&candidates, strategy, &excluded) else {
                break;
            };
            let attendant_id = chosen.user_id.clone();
            let now = self.time_service.now();

            if !self
                .attendant_repo
                .try_reserve_capacity(&attendant_id, company_id, now)
                .await?
            {
                metrics::counter!("wadesk_capacity_races_total").increment(1);
                excluded.insert(attendant_id);
                continue;
            }

            let committed = match self
                .assignment_repo
                .try_assign(chat_id, Some(&previous), &attendant_id, now)
                .await
            {
                Ok(committed) => committed,
                Err(e) => {
                    self.release_slot(&attendant_id, company_id).await;
                    return Err(e);
                }
            };

            if !committed {
                self.release_slot(&attendant_id, company_id).await;
                tracing::info!(
                    "Chat {} changed while reassigning away from {}; leaving it",
                    chat_id,
                    previous
                );
                return Ok(None);
            }

            // The old owner's slot is released only after the new owner holds the chat.
            // The move is committed either way, so a failed release is logged, not raised.
            self.release_slot(&previous, company_id).await;

            self.record_history(
                assignment,
                Some(&previous),
                Some(&attendant_id),
                AssignmentReason::ReassignedStale,
            )
            .await;
            let _ = self.event_bus.publish(SystemEvent::ChatReassigned {
                chat_id: chat_id.to_string(),
                company_id: company_id.to_string(),
                previous_attendant_id: previous.clone(),
                attendant_id: attendant_id.clone(),
                timestamp: format_timestamp(now),
            });
            metrics::counter!("wadesk_chats_reassigned_total").increment(1);
            tracing::info!(
                "Chat {} reassigned from silent attendant {} to {}",
                chat_id,
                previous,
                attendant_id
            );

            return Ok(Some(attendant_id));
        }

        tracing::warn!(
            "Chat {} is stale on attendant {} but nobody else is available",
            chat_id,
            previous
        );
        Ok(None)
    }

    /// Hand out queued chats, oldest first, until the queue or capacity runs out.
    pub async fn distribute_queue(&self, company_id: &str) -> ApiResult<u64> {
        let queued = self.assignment_repo.list_unassigned(company_id).await?;
        let mut assigned = 0;

        for chat in queued {
            match self.distribute_chat(&chat.chat_id, company_id).await? {
                DistributionOutcome::Assigned { .. } => assigned += 1,
                DistributionOutcome::NoAttendantAvailable => break,
                _ => {}
            }
        }

        if assigned > 0 {
            tracing::info!("Drained {} queued chats in company {}", assigned, company_id);
        }

        Ok(assigned)
    }

    async fn outcome_after_lost_commit(&self, chat_id: &str) -> ApiResult<DistributionOutcome> {
        let current = self.assignment_repo.get_by_chat_id(chat_id).await?;
        Ok(match current {
            Some(ChatAssignment {
                assigned_to: Some(owner),
                status: AssignmentStatus::Assigned | AssignmentStatus::Active,
                ..
            }) => DistributionOutcome::AlreadyAssigned {
                attendant_id: owner,
            },
            _ => DistributionOutcome::NotDistributable,
        })
    }

    /// Decrement for a slot that no longer backs a chat. A failure here leaves the
    /// counter one too high until an operator corrects it, so it is logged loudly.
    async fn release_slot(&self, attendant_id: &str, company_id: &str) {
        if let Err(e) = self
            .attendant_repo
            .adjust_load(
                attendant_id,
                company_id,
                -1,
                self.default_max_chats,
                self.time_service.now(),
            )
            .await
        {
            tracing::error!(
                "Failed to release a chat slot for attendant {} in company {}: {}",
                attendant_id,
                company_id,
                e
            );
        }
    }

    async fn record_history(
        &self,
        assignment: &ChatAssignment,
        from: Option<&str>,
        to: Option<&str>,
        reason: AssignmentReason,
    ) {
        let history = AssignmentHistory::new(
            assignment.chat_id.clone(),
            assignment.company_id.clone(),
            from.map(str::to_string),
            to.map(str::to_string),
            reason,
            self.time_service.now(),
        );

        if let Err(e) = self.assignment_repo.record_history(&history).await {
            tracing::warn!(
                "Failed to record assignment history for chat {}: {}",
                assignment.chat_id,
                e
            );
        }
    }
}
