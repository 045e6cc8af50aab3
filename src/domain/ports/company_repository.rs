use crate::domain::entities::{CompanySettings, DistributionStrategy};
use crate::infrastructure::http::middleware::error::ApiResult;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn get_settings(&self, company_id: &str) -> ApiResult<Option<CompanySettings>>;

    async fn upsert_strategy(
        &self,
        company_id: &str,
        strategy: DistributionStrategy,
        at: DateTime<Utc>,
    ) -> ApiResult<()>;

    async fn set_active(&self, company_id: &str, active: bool, at: DateTime<Utc>)
        -> ApiResult<()>;

    /// Companies with settings marked active, plus companies that only appear
    /// in attendant or chat rows. Explicitly deactivated companies are excluded.
    async fn list_active_companies(&self) -> ApiResult<Vec<String>>;
}
