use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one sweep pass over one company. Steps fail independently.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanySweepResult {
    pub company_id: String,
    pub expired: u64,
    pub reassigned: u64,
    pub demoted: u64,
    pub queue_assigned: u64,
    pub errors: Vec<String>,
}

impl CompanySweepResult {
    pub fn new(company_id: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub companies: Vec<CompanySweepResult>,
}

impl SweepReport {
    pub fn total_expired(&self) -> u64 {
        self.companies.iter().map(|c| c.expired).sum()
    }

    pub fn total_reassigned(&self) -> u64 {
        self.companies.iter().map(|c| c.reassigned).sum()
    }

    pub fn total_demoted(&self) -> u64 {
        self.companies.iter().map(|c| c.demoted).sum()
    }

    pub fn failed_companies(&self) -> Vec<&str> {
        self.companies
            .iter()
            .filter(|c| !c.is_clean())
            .map(|c| c.company_id.as_str())
            .collect()
    }
}
