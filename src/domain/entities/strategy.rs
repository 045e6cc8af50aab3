use crate::domain::errors::DomainError;
use serde::{Deserialize, Serialize};

/// Per-company policy for choosing between eligible attendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    RoundRobin,
    LeastLoaded,
}

impl DistributionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionStrategy::RoundRobin => "round_robin",
            DistributionStrategy::LeastLoaded => "least_loaded",
        }
    }
}

impl Default for DistributionStrategy {
    fn default() -> Self {
        DistributionStrategy::LeastLoaded
    }
}

impl std::fmt::Display for DistributionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistributionStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "round_robin" => Ok(DistributionStrategy::RoundRobin),
            "least_loaded" => Ok(DistributionStrategy::LeastLoaded),
            _ => Err(DomainError::InvalidValue {
                field: "distribution strategy",
                value: s.to_string(),
            }),
        }
    }
}
