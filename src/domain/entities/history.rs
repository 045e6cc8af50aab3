use super::AttendantState;
use crate::domain::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentReason {
    Distributed,
    ReassignedStale,
    Resolved,
}

impl AssignmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentReason::Distributed => "distributed",
            AssignmentReason::ReassignedStale => "reassigned_stale",
            AssignmentReason::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for AssignmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "distributed" => Ok(AssignmentReason::Distributed),
            "reassigned_stale" => Ok(AssignmentReason::ReassignedStale),
            "resolved" => Ok(AssignmentReason::Resolved),
            _ => Err(DomainError::InvalidValue {
                field: "assignment reason",
                value: s.to_string(),
            }),
        }
    }
}

/// Audit row for every change of a chat's owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentHistory {
    pub id: String,
    pub chat_id: String,
    pub company_id: String,
    pub from_attendant: Option<String>,
    pub to_attendant: Option<String>,
    pub reason: AssignmentReason,
    pub created_at: DateTime<Utc>,
}

impl AssignmentHistory {
    pub fn new(
        chat_id: String,
        company_id: String,
        from_attendant: Option<String>,
        to_attendant: Option<String>,
        reason: AssignmentReason,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            company_id,
            from_attendant,
            to_attendant,
            reason,
            created_at,
        }
    }
}

/// Audit row for an attendant availability transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendantActivityLog {
    pub id: String,
    pub user_id: String,
    pub company_id: String,
    pub old_status: Option<AttendantState>,
    pub new_status: AttendantState,
    /// "manual" or "inactivity_timeout"
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl AttendantActivityLog {
    pub fn new(
        user_id: String,
        company_id: String,
        old_status: Option<AttendantState>,
        new_status: AttendantState,
        reason: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            company_id,
            old_status,
            new_status,
            reason: reason.to_string(),
            created_at,
        }
    }
}
