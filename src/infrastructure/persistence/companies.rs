use super::{parsed, required_time, Database};
use crate::domain::entities::{CompanySettings, DistributionStrategy};
use crate::domain::ports::company_repository::CompanyRepository;
use crate::infrastructure::http::middleware::error::ApiResult;
use crate::shared::utils::format_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

#[async_trait]
impl CompanyRepository for Database {
    async fn get_settings(&self, company_id: &str) -> ApiResult<Option<CompanySettings>> {
        let row = sqlx::query(
            "SELECT company_id, strategy, active, updated_at
             FROM company_settings
             WHERE company_id = ?",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let active: i64 = row.try_get("active")?;
                Ok(Some(CompanySettings {
                    company_id: row.try_get("company_id")?,
                    strategy: parsed(&row, "strategy")?,
                    active: active != 0,
                    updated_at: required_time(&row, "updated_at")?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn upsert_strategy(
        &self,
        company_id: &str,
        strategy: DistributionStrategy,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        sqlx::query(
            "INSERT INTO company_settings (company_id, strategy, active, updated_at)
             VALUES (?, ?, 1, ?)
             ON CONFLICT(company_id) DO UPDATE SET
                strategy = excluded.strategy,
                updated_at = excluded.updated_at",
        )
        .bind(company_id)
        .bind(strategy.as_str())
        .bind(format_timestamp(at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_active(
        &self,
        company_id: &str,
        active: bool,
        at: DateTime<Utc>,
    ) -> ApiResult<()> {
        let flag: i64 = if active { 1 } else { 0 };
        sqlx::query(
            "INSERT INTO company_settings (company_id, strategy, active, updated_at)
             VALUES (?, 'least_loaded', ?, ?)
             ON CONFLICT(company_id) DO UPDATE SET
                active = excluded.active,
                updated_at = excluded.updated_at",
        )
        .bind(company_id)
        .bind(flag)
        .bind(format_timestamp(at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_active_companies(&self) -> ApiResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT company_id FROM (
                 SELECT company_id FROM company_settings WHERE active = 1
                 UNION
                 SELECT company_id FROM attendant_status
                 UNION
                 SELECT company_id FROM chat_assignments
             )
             WHERE company_id NOT IN (
                 SELECT company_id FROM company_settings WHERE active = 0
             )
             ORDER BY company_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> ApiResult<String> { Ok(row.try_get("company_id")?) })
            .collect()
    }
}
