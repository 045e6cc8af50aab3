use super::DistributionStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySettings {
    pub company_id: String,
    pub strategy: DistributionStrategy,
    /// Inactive companies are skipped by the sweep.
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl CompanySettings {
    pub fn new(company_id: String, now: DateTime<Utc>) -> Self {
        Self {
            company_id,
            strategy: DistributionStrategy::default(),
            active: true,
            updated_at: now,
        }
    }
}
