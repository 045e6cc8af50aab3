use super::{setup_test_db, FaultyStore, ManualClock, TestDatabase};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use wadesk::bootstrap::{build_services, build_services_with};
use wadesk::config::EngineSettings;
use wadesk::domain::entities::{AttendantState, AttendantStatus, ChatAssignment};
use wadesk::infrastructure::http::middleware::AppState;
use wadesk::infrastructure::persistence::Database;

pub const COMPANY: &str = "company-acme";
pub const OTHER_COMPANY: &str = "company-globex";

pub struct TestHarness {
    pub test_db: TestDatabase,
    pub clock: ManualClock,
    pub state: AppState,
}

impl TestHarness {
    pub fn db(&self) -> Database {
        self.test_db.db()
    }

    pub fn now(&self) -> DateTime<Utc> {
        use wadesk::domain::ports::time_service::TimeService;
        self.clock.now()
    }

    /// Attendant marked available with the given capacity.
    pub async fn available_attendant(
        &self,
        company_id: &str,
        user_id: &str,
        max_chats: i64,
    ) -> AttendantStatus {
        let registry = &self.state.attendant_registry;
        registry
            .set_max_chats(user_id, company_id, max_chats)
            .await
            .expect("Failed to set capacity");
        registry
            .set_status(user_id, company_id, AttendantState::Available)
            .await
            .expect("Failed to set status")
    }

    pub async fn attendant(&self, company_id: &str, user_id: &str) -> AttendantStatus {
        self.state
            .attendant_registry
            .get_status(user_id, company_id)
            .await
            .expect("Failed to read attendant")
            .expect("Attendant should exist")
    }

    pub async fn chat(&self, chat_id: &str) -> ChatAssignment {
        self.state
            .assignment_service
            .get_by_chat_id(chat_id)
            .await
            .expect("Failed to read chat")
            .expect("Chat should exist")
    }

    /// Customer message through the webhook entry point, at the current clock.
    pub async fn customer_writes(&self, company_id: &str, chat_id: &str) -> ChatAssignment {
        self.state
            .intake_service
            .handle_inbound_message(chat_id, company_id, None)
            .await
            .expect("Failed to handle inbound message")
            .assignment
    }

    pub async fn attendant_replies(&self, chat_id: &str) -> ChatAssignment {
        self.state
            .intake_service
            .handle_outbound_message(chat_id, None)
            .await
            .expect("Failed to handle outbound message")
    }
}

pub async fn setup() -> TestHarness {
    setup_with(EngineSettings::default()).await
}

pub async fn setup_with(settings: EngineSettings) -> TestHarness {
    let test_db = setup_test_db().await;
    let clock = ManualClock::starting_monday();
    let state = build_services(test_db.db(), &settings, Arc::new(clock.clone()));

    TestHarness {
        test_db,
        clock,
        state,
    }
}

/// Harness whose attendant and assignment stores can be made to fail on demand.
pub async fn setup_faulty() -> (TestHarness, Arc<FaultyStore>) {
    let test_db = setup_test_db().await;
    let clock = ManualClock::starting_monday();
    let store = Arc::new(FaultyStore::new(test_db.db()));
    let state = build_services_with(
        store.clone(),
        store.clone(),
        Arc::new(test_db.db()),
        &EngineSettings::default(),
        Arc::new(clock.clone()),
    );

    (
        TestHarness {
            test_db,
            clock,
            state,
        },
        store,
    )
}

pub async fn chat_row_count(db: &Database, chat_id: &str) -> i64 {
    use sqlx::Row;
    sqlx::query("SELECT COUNT(*) AS count FROM chat_assignments WHERE chat_id = ?")
        .bind(chat_id)
        .fetch_one(db.pool())
        .await
        .expect("Failed to count chat rows")
        .try_get("count")
        .expect("count column")
}
