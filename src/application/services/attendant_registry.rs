use crate::domain::entities::{AttendantActivityLog, AttendantState, AttendantStatus};
use crate::domain::errors::DomainError;
use crate::domain::events::SystemEvent;
use crate::domain::ports::{
    attendant_repository::AttendantRepository, event_bus::EventBus, time_service::TimeService,
};
use crate::domain::services::window;
use crate::infrastructure::http::middleware::error::{ApiError, ApiResult};
use crate::shared::utils::format_timestamp;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Authoritative source of attendant availability and load.
///
/// Nothing is cached: every read goes to the store and every load change is an
/// in-store increment, so several server instances can share one registry.
#[derive(Clone)]
pub struct AttendantRegistry {
    attendant_repo: Arc<dyn AttendantRepository>,
    event_bus: Arc<dyn EventBus>,
    time_service: Arc<dyn TimeService>,
    default_max_chats: i64,
}

impl AttendantRegistry {
    pub fn new(
        attendant_repo: Arc<dyn AttendantRepository>,
        event_bus: Arc<dyn EventBus>,
        time_service: Arc<dyn TimeService>,
        default_max_chats: i64,
    ) -> Self {
        Self {
            attendant_repo,
            event_bus,
            time_service,
            default_max_chats,
        }
    }

    /// Set availability. Going offline keeps current chats; the sweep handles them.
    pub async fn set_status(
        &self,
        user_id: &str,
        company_id: &str,
        status: AttendantState,
    ) -> ApiResult<AttendantStatus> {
        let now = self.time_service.now();
        let previous = self.attendant_repo.get_attendant(user_id, company_id).await?;
        let old_status = previous.as_ref().map(|a| a.status);

        self.attendant_repo
            .upsert_status(user_id, company_id, status, self.default_max_chats, now)
            .await?;

        if old_status != Some(status) {
            self.log_transition(user_id, company_id, old_status, status, "manual")
                .await;
            tracing::info!(
                "Attendant {} in company {} changed status {:?} -> {}",
                user_id,
                company_id,
                old_status,
                status
            );
        }

        self.require(user_id, company_id).await
    }

    /// Capacity changes never unassign; an over-capacity attendant just stops
    /// receiving new chats.
    pub async fn set_max_chats(
        &self,
        user_id: &str,
        company_id: &str,
        max_chats: i64,
    ) -> ApiResult<AttendantStatus> {
        if max_chats < 0 {
            return Err(DomainError::ValidationError(
                "max_chats must be zero or greater".to_string(),
            )
            .into());
        }

        self.attendant_repo
            .upsert_max_chats(user_id, company_id, max_chats, self.time_service.now())
            .await?;

        tracing::info!(
            "Attendant {} in company {} capacity set to {}",
            user_id,
            company_id,
            max_chats
        );

        self.require(user_id, company_id).await
    }

    pub async fn record_heartbeat(&self, user_id: &str, company_id: &str) -> ApiResult<()> {
        self.attendant_repo
            .touch_activity(
                user_id,
                company_id,
                self.default_max_chats,
                self.time_service.now(),
            )
            .await
    }

    /// Atomic +1/-1 on `active_chats`. The counter never goes below zero.
    pub async fn increment_load(
        &self,
        user_id: &str,
        company_id: &str,
        delta: i64,
    ) -> ApiResult<()> {
        if delta != 1 && delta != -1 {
            return Err(ApiError::BadRequest(format!(
                "Load can only change by one chat at a time, got {}",
                delta
            )));
        }

        self.attendant_repo
            .adjust_load(
                user_id,
                company_id,
                delta,
                self.default_max_chats,
                self.time_service.now(),
            )
            .await
    }

    pub async fn get_status(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> ApiResult<Option<AttendantStatus>> {
        self.attendant_repo.get_attendant(user_id, company_id).await
    }

    pub async fn list_by_company(&self, company_id: &str) -> ApiResult<Vec<AttendantStatus>> {
        self.attendant_repo.list_by_company(company_id).await
    }

    /// Every state appears in the result, with zero when nobody is in it.
    pub async fn count_by_status(
        &self,
        company_id: &str,
    ) -> ApiResult<BTreeMap<AttendantState, i64>> {
        let mut counts: BTreeMap<AttendantState, i64> =
            AttendantState::ALL.iter().map(|s| (*s, 0)).collect();

        for (status, count) in self.attendant_repo.count_by_status(company_id).await? {
            counts.insert(status, count);
        }

        Ok(counts)
    }

    /// Mean of `active_chats / max_chats` over attendants with capacity; 0 if none.
    pub async fn average_load(&self, company_id: &str) -> ApiResult<f64> {
        let attendants = self.attendant_repo.list_by_company(company_id).await?;
        Ok(average_load_of(&attendants))
    }

    /// Force offline every attendant silent for longer than `inactivity_minutes`.
    pub async fn mark_inactive_offline(
        &self,
        company_id: &str,
        inactivity_minutes: i64,
    ) -> ApiResult<u64> {
        let now = self.time_service.now();
        let threshold = window::minutes_threshold(inactivity_minutes)?;
        let cutoff = window::cutoff_before(now, threshold)?;

        let demoted = self
            .attendant_repo
            .demote_inactive(company_id, cutoff, now)
            .await?;

        for attendant in &demoted {
            self.log_transition(
                &attendant.user_id,
                company_id,
                Some(attendant.status),
                AttendantState::Offline,
                "inactivity_timeout",
            )
            .await;
            tracing::info!(
                "Attendant {} in company {} went offline after {} minutes of inactivity",
                attendant.user_id,
                company_id,
                inactivity_minutes
            );
        }

        if !demoted.is_empty() {
            metrics::counter!("wadesk_attendants_demoted_total").increment(demoted.len() as u64);
        }

        Ok(demoted.len() as u64)
    }

    pub async fn activity_log(
        &self,
        user_id: &str,
        company_id: &str,
        limit: i64,
    ) -> ApiResult<Vec<AttendantActivityLog>> {
        self.attendant_repo
            .list_activity_logs(user_id, company_id, limit)
            .await
    }

    async fn require(&self, user_id: &str, company_id: &str) -> ApiResult<AttendantStatus> {
        self.attendant_repo
            .get_attendant(user_id, company_id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!("Attendant {} vanished after upsert", user_id))
            })
    }

    /// Audit and broadcast a transition. Failures here never fail the caller.
    async fn log_transition(
        &self,
        user_id: &str,
        company_id: &str,
        old_status: Option<AttendantState>,
        new_status: AttendantState,
        reason: &str,
    ) {
        let now = self.time_service.now();
        let log = AttendantActivityLog::new(
            user_id.to_string(),
            company_id.to_string(),
            old_status,
            new_status,
            reason,
            now,
        );

        if let Err(e) = self.attendant_repo.create_activity_log(&log).await {
            tracing::warn!("Failed to record activity log for {}: {}", user_id, e);
        }

        let _ = self.event_bus.publish(SystemEvent::AttendantStatusChanged {
            user_id: user_id.to_string(),
            company_id: company_id.to_string(),
            old_status,
            new_status,
            reason: reason.to_string(),
            timestamp: format_timestamp(now),
        });
    }
}

pub fn average_load_of(attendants: &[AttendantStatus]) -> f64 {
    let ratios: Vec<f64> = attendants
        .iter()
        .filter(|a| a.max_chats > 0)
        .map(AttendantStatus::load_ratio)
        .collect();

    if ratios.is_empty() {
        0.0
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }
}
