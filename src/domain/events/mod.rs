use crate::domain::entities::AttendantState;

/// Events emitted by the distribution engine for real-time fan-out.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    ChatQueued {
        chat_id: String,
        company_id: String,
        timestamp: String, // ISO 8601
    },
    ChatAssigned {
        chat_id: String,
        company_id: String,
        attendant_id: String,
        timestamp: String, // ISO 8601
    },
    ChatReassigned {
        chat_id: String,
        company_id: String,
        previous_attendant_id: String,
        attendant_id: String,
        timestamp: String, // ISO 8601
    },
    ChatExpired {
        chat_id: String,
        company_id: String,
        timestamp: String, // ISO 8601
    },
    ChatReopened {
        chat_id: String,
        company_id: String,
        timestamp: String, // ISO 8601
    },
    ChatResolved {
        chat_id: String,
        company_id: String,
        attendant_id: Option<String>,
        timestamp: String, // ISO 8601
    },
    AttendantStatusChanged {
        user_id: String,
        company_id: String,
        old_status: Option<AttendantState>,
        new_status: AttendantState,
        reason: String, // "manual", "inactivity_timeout"
        timestamp: String, // ISO 8601
    },
}

impl SystemEvent {
    pub fn company_id(&self) -> &str {
        match self {
            SystemEvent::ChatQueued { company_id, .. }
            | SystemEvent::ChatAssigned { company_id, .. }
            | SystemEvent::ChatReassigned { company_id, .. }
            | SystemEvent::ChatExpired { company_id, .. }
            | SystemEvent::ChatReopened { company_id, .. }
            | SystemEvent::ChatResolved { company_id, .. }
            | SystemEvent::AttendantStatusChanged { company_id, .. } => company_id,
        }
    }
}
