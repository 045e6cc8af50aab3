use super::{AssignmentStatus, AttendantState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct AttendantLoad {
    pub user_id: String,
    pub status: AttendantState,
    pub active_chats: i64,
    pub max_chats: i64,
    /// `active_chats / max_chats` as a percentage, 0 when capacity is 0.
    pub load_percent: f64,
}

/// Operational dashboard rollup for one company.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub company_id: String,
    pub attendants_by_status: BTreeMap<AttendantState, i64>,
    pub attendant_loads: Vec<AttendantLoad>,
    pub average_load: f64,
    pub queue_size: i64,
    pub chats_by_status: BTreeMap<AssignmentStatus, i64>,
    pub total_chats: i64,
    pub generated_at: DateTime<Utc>,
}
