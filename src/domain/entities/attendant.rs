use crate::domain::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capacity given to an attendant row created implicitly by a heartbeat or status call.
pub const DEFAULT_MAX_CHATS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendantState {
    Available,
    Busy,
    Away,
    Offline,
}

impl AttendantState {
    pub const ALL: [AttendantState; 4] = [
        AttendantState::Available,
        AttendantState::Busy,
        AttendantState::Away,
        AttendantState::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendantState::Available => "available",
            AttendantState::Busy => "busy",
            AttendantState::Away => "away",
            AttendantState::Offline => "offline",
        }
    }
}

impl Default for AttendantState {
    fn default() -> Self {
        AttendantState::Offline
    }
}

impl std::fmt::Display for AttendantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendantState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(AttendantState::Available),
            "busy" => Ok(AttendantState::Busy),
            "away" => Ok(AttendantState::Away),
            "offline" => Ok(AttendantState::Offline),
            _ => Err(DomainError::InvalidValue {
                field: "attendant status",
                value: s.to_string(),
            }),
        }
    }
}

/// Availability and workload of one attendant inside one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendantStatus {
    pub user_id: String,
    pub company_id: String,
    pub status: AttendantState,
    pub active_chats: i64,
    pub max_chats: i64,
    pub last_activity_at: DateTime<Utc>,
    /// Last time capacity was reserved for this attendant; drives round-robin rotation.
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendantStatus {
    pub fn new(user_id: String, company_id: String, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            company_id,
            status: AttendantState::default(),
            active_chats: 0,
            max_chats: DEFAULT_MAX_CHATS,
            last_activity_at: now,
            last_assigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Utilization in `[0, 1+]`; zero-capacity attendants report 0.
    pub fn load_ratio(&self) -> f64 {
        if self.max_chats > 0 {
            self.active_chats as f64 / self.max_chats as f64
        } else {
            0.0
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active_chats < self.max_chats
    }

    pub fn is_eligible(&self) -> bool {
        self.status == AttendantState::Available && self.has_capacity()
    }
}
