use super::{
    assignment_service::AssignmentService, attendant_registry::AttendantRegistry,
    company_service::CompanySettingsService, distribution_engine::DistributionEngine,
};
use crate::config::EngineSettings;
use crate::domain::entities::{CompanySweepResult, SweepReport};
use crate::domain::ports::time_service::TimeService;
use crate::infrastructure::http::middleware::error::ApiResult;
use std::fmt::Display;
use std::sync::Arc;

/// Periodic corrective pass: expiry, stale reassignment, inactivity demotion,
/// then a queue drain so chats freed by the first three steps find owners.
#[derive(Clone)]
pub struct SweepService {
    assignments: AssignmentService,
    registry: AttendantRegistry,
    engine: DistributionEngine,
    companies: CompanySettingsService,
    time_service: Arc<dyn TimeService>,
    settings: EngineSettings,
}

impl SweepService {
    pub fn new(
        assignments: AssignmentService,
        registry: AttendantRegistry,
        engine: DistributionEngine,
        companies: CompanySettingsService,
        time_service: Arc<dyn TimeService>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            assignments,
            registry,
            engine,
            companies,
            time_service,
            settings,
        }
    }

    /// Sweep every active company. Only the company listing itself can fail.
    pub async fn run_all(&self) -> ApiResult<SweepReport> {
        let companies = self.companies.list_active_companies().await?;
        Ok(self.run_companies(&companies).await)
    }

    pub async fn run_companies(&self, company_ids: &[String]) -> SweepReport {
        let started_at = self.time_service.now();
        let mut results = Vec::with_capacity(company_ids.len());

        for company_id in company_ids {
            results.push(self.run_for_company(company_id).await);
        }

        let report = SweepReport {
            started_at,
            finished_at: self.time_service.now(),
            companies: results,
        };

        tracing::info!(
            "Sweep finished for {} companies: {} expired, {} reassigned, {} demoted, {} failed",
            report.companies.len(),
            report.total_expired(),
            report.total_reassigned(),
            report.total_demoted(),
            report.failed_companies().len()
        );

        report
    }

    /// Each step runs even if an earlier one failed; failures are recorded, not raised.
    pub async fn run_for_company(&self, company_id: &str) -> CompanySweepResult {
        let mut result = CompanySweepResult::new(company_id);

        match self.assignments.mark_expired(company_id).await {
            Ok(count) => result.expired = count,
            Err(e) => record_failure(&mut result, "mark_expired", e),
        }

        match self
            .assignments
            .reassign_stale(company_id, self.settings.stale_assignment_hours)
            .await
        {
            Ok(count) => result.reassigned = count,
            Err(e) => record_failure(&mut result, "reassign_stale", e),
        }

        match self
            .registry
            .mark_inactive_offline(company_id, self.settings.inactivity_minutes)
            .await
        {
            Ok(count) => result.demoted = count,
            Err(e) => record_failure(&mut result, "mark_inactive_offline", e),
        }

        match self.engine.distribute_queue(company_id).await {
            Ok(count) => result.queue_assigned = count,
            Err(e) => record_failure(&mut result, "distribute_queue", e),
        }

        result
    }
}

fn record_failure(result: &mut CompanySweepResult, step: &str, error: impl Display) {
    tracing::error!(
        "Sweep step {} failed for company {}: {}",
        step,
        result.company_id,
        error
    );
    metrics::counter!("wadesk_sweep_failures_total", "step" => step.to_string()).increment(1);
    result.errors.push(format!("{}: {}", step, error));
}
