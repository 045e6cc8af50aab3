use crate::domain::errors::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// WhatsApp customer-service window length.
pub const WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Unassigned,
    Assigned,
    Active,
    Resolved,
    Expired,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 5] = [
        AssignmentStatus::Unassigned,
        AssignmentStatus::Assigned,
        AssignmentStatus::Active,
        AssignmentStatus::Resolved,
        AssignmentStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Unassigned => "unassigned",
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::Active => "active",
            AssignmentStatus::Resolved => "resolved",
            AssignmentStatus::Expired => "expired",
        }
    }

    /// `assigned` and `active` hold an attendant's attention.
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Assigned | AssignmentStatus::Active)
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unassigned" => Ok(AssignmentStatus::Unassigned),
            "assigned" => Ok(AssignmentStatus::Assigned),
            "active" => Ok(AssignmentStatus::Active),
            "resolved" => Ok(AssignmentStatus::Resolved),
            "expired" => Ok(AssignmentStatus::Expired),
            _ => Err(DomainError::InvalidValue {
                field: "assignment status",
                value: s.to_string(),
            }),
        }
    }
}

/// Binding of one chat to at most one attendant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAssignment {
    pub chat_id: String,
    pub company_id: String,
    pub assigned_to: Option<String>,
    pub status: AssignmentStatus,
    pub assigned_at: Option<DateTime<Utc>>,
    pub last_customer_message_at: DateTime<Utc>,
    pub last_attendant_message_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
    pub window_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatAssignment {
    /// A fresh, queued assignment opened by a customer message.
    pub fn new(chat_id: String, company_id: String, customer_message_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            chat_id,
            company_id,
            assigned_to: None,
            status: AssignmentStatus::Unassigned,
            assigned_at: None,
            last_customer_message_at: customer_message_at,
            last_attendant_message_at: None,
            last_activity_at: customer_message_at,
            window_expires_at: window_expiry_for(customer_message_at),
            created_at: now,
            updated_at: now,
        }
    }

    /// Waiting for an attendant: never assigned, or an `assigned` row that lost its attendant.
    pub fn is_queued(&self) -> bool {
        match self.status {
            AssignmentStatus::Unassigned => true,
            AssignmentStatus::Assigned => self.assigned_to.is_none(),
            _ => false,
        }
    }
}

pub fn window_expiry_for(customer_message_at: DateTime<Utc>) -> DateTime<Utc> {
    customer_message_at + Duration::hours(WINDOW_HOURS)
}
