use super::attendant_registry::average_load_of;
use crate::domain::entities::{AssignmentStatus, AttendantLoad, AttendantState, DashboardSnapshot};
use crate::domain::ports::{
    assignment_repository::AssignmentRepository, attendant_repository::AttendantRepository,
    time_service::TimeService,
};
use crate::infrastructure::http::middleware::error::ApiResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only dashboard rollups over attendants and chats.
#[derive(Clone)]
pub struct MetricsAggregator {
    attendant_repo: Arc<dyn AttendantRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    time_service: Arc<dyn TimeService>,
}

impl MetricsAggregator {
    pub fn new(
        attendant_repo: Arc<dyn AttendantRepository>,
        assignment_repo: Arc<dyn AssignmentRepository>,
        time_service: Arc<dyn TimeService>,
    ) -> Self {
        Self {
            attendant_repo,
            assignment_repo,
            time_service,
        }
    }

    pub async fn snapshot(&self, company_id: &str) -> ApiResult<DashboardSnapshot> {
        let (attendants, attendant_counts, queue_size, chat_counts) = tokio::try_join!(
            self.attendant_repo.list_by_company(company_id),
            self.attendant_repo.count_by_status(company_id),
            self.assignment_repo.count_unassigned(company_id),
            self.assignment_repo.count_by_status(company_id),
        )?;

        let mut attendants_by_status: BTreeMap<AttendantState, i64> =
            AttendantState::ALL.iter().map(|s| (*s, 0)).collect();
        attendants_by_status.extend(attendant_counts);

        let mut chats_by_status: BTreeMap<AssignmentStatus, i64> =
            AssignmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        chats_by_status.extend(chat_counts);

        let attendant_loads = attendants
            .iter()
            .map(|a| AttendantLoad {
                user_id: a.user_id.clone(),
                status: a.status,
                active_chats: a.active_chats,
                max_chats: a.max_chats,
                load_percent: a.load_ratio() * 100.0,
            })
            .collect();

        Ok(DashboardSnapshot {
            company_id: company_id.to_string(),
            attendants_by_status,
            attendant_loads,
            average_load: average_load_of(&attendants),
            queue_size,
            total_chats: chats_by_status.values().sum(),
            chats_by_status,
            generated_at: self.time_service.now(),
        })
    }
}
