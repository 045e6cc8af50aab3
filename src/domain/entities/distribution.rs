use serde::Serialize;

/// Result of trying to place a chat with an attendant.
///
/// Only storage failures are errors; every business outcome is a variant here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DistributionOutcome {
    Assigned { attendant_id: String },
    /// Someone else (a concurrent delivery of the same webhook) already placed the chat.
    AlreadyAssigned { attendant_id: String },
    /// Chat stays queued.
    NoAttendantAvailable,
    /// Chat is unknown, resolved, expired, or belongs to another company.
    NotDistributable,
}

impl DistributionOutcome {
    pub fn attendant_id(&self) -> Option<&str> {
        match self {
            DistributionOutcome::Assigned { attendant_id }
            | DistributionOutcome::AlreadyAssigned { attendant_id } => Some(attendant_id),
            _ => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, DistributionOutcome::Assigned { .. })
    }
}
