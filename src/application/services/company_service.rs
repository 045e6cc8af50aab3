use crate::domain::entities::{CompanySettings, DistributionStrategy};
use crate::domain::ports::{company_repository::CompanyRepository, time_service::TimeService};
use crate::infrastructure::http::middleware::error::ApiResult;
use std::sync::Arc;

#[derive(Clone)]
pub struct CompanySettingsService {
    company_repo: Arc<dyn CompanyRepository>,
    time_service: Arc<dyn TimeService>,
}

impl CompanySettingsService {
    pub fn new(
        company_repo: Arc<dyn CompanyRepository>,
        time_service: Arc<dyn TimeService>,
    ) -> Self {
        Self {
            company_repo,
            time_service,
        }
    }

    /// Companies without a settings row distribute least-loaded.
    pub async fn get_strategy(&self, company_id: &str) -> ApiResult<DistributionStrategy> {
        Ok(self
            .company_repo
            .get_settings(company_id)
            .await?
            .map(|s| s.strategy)
            .unwrap_or_default())
    }

    pub async fn get_settings(&self, company_id: &str) -> ApiResult<CompanySettings> {
        Ok(self
            .company_repo
            .get_settings(company_id)
            .await?
            .unwrap_or_else(|| {
                CompanySettings::new(company_id.to_string(), self.time_service.now())
            }))
    }

    pub async fn set_strategy(
        &self,
        company_id: &str,
        strategy: DistributionStrategy,
    ) -> ApiResult<CompanySettings> {
        self.company_repo
            .upsert_strategy(company_id, strategy, self.time_service.now())
            .await?;
        tracing::info!("Company {} now distributes {}", company_id, strategy);
        self.get_settings(company_id).await
    }

    pub async fn set_active(&self, company_id: &str, active: bool) -> ApiResult<CompanySettings> {
        self.company_repo
            .set_active(company_id, active, self.time_service.now())
            .await?;
        tracing::info!(
            "Company {} {}",
            company_id,
            if active { "activated" } else { "deactivated" }
        );
        self.get_settings(company_id).await
    }

    pub async fn list_active_companies(&self) -> ApiResult<Vec<String>> {
        self.company_repo.list_active_companies().await
    }
}
