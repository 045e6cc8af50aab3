use crate::application::services::*;
use crate::config::{Config, EngineSettings};
use crate::domain::ports::assignment_repository::AssignmentRepository;
use crate::domain::ports::attendant_repository::AttendantRepository;
use crate::domain::ports::company_repository::CompanyRepository;
use crate::domain::ports::distributed_lock::DistributedLock;
use crate::domain::ports::event_bus::EventBus;
use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::time_service::TimeService;
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::persistence::{Database, DatabaseDistributedLock};
use crate::infrastructure::runtime::{TokioTaskSpawner, TokioTimeService};
use crate::infrastructure::workers::SweepWorker;
use crate::LocalEventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Wire every service against one database and clock. Starts nothing.
pub fn build_services(
    db: Database,
    settings: &EngineSettings,
    time_service: Arc<dyn TimeService>,
) -> AppState {
    build_services_with(
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        Arc::new(db),
        settings,
        time_service,
    )
}

/// Same wiring over arbitrary store implementations.
pub fn build_services_with(
    attendant_repo: Arc<dyn AttendantRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    company_repo: Arc<dyn CompanyRepository>,
    settings: &EngineSettings,
    time_service: Arc<dyn TimeService>,
) -> AppState {
    let event_bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::new(1000));

    let attendant_registry = AttendantRegistry::new(
        attendant_repo.clone(),
        event_bus.clone(),
        time_service.clone(),
        settings.default_max_chats,
    );

    let distribution_engine = DistributionEngine::new(
        attendant_repo.clone(),
        assignment_repo.clone(),
        company_repo.clone(),
        event_bus.clone(),
        time_service.clone(),
        settings.max_distribution_attempts,
        settings.default_max_chats,
    );

    let assignment_service = AssignmentService::new(
        assignment_repo.clone(),
        attendant_repo.clone(),
        distribution_engine.clone(),
        event_bus.clone(),
        time_service.clone(),
        settings.default_max_chats,
    );

    let intake_service = ChatIntakeService::new(
        assignment_service.clone(),
        distribution_engine.clone(),
        time_service.clone(),
    );

    let company_service = CompanySettingsService::new(company_repo, time_service.clone());

    let metrics_aggregator =
        MetricsAggregator::new(attendant_repo, assignment_repo, time_service.clone());

    let sweep_service = SweepService::new(
        assignment_service.clone(),
        attendant_registry.clone(),
        distribution_engine.clone(),
        company_service.clone(),
        time_service.clone(),
        settings.clone(),
    );

    AppState {
        event_bus,
        time_service,
        attendant_registry,
        assignment_service,
        distribution_engine,
        intake_service,
        company_service,
        metrics_aggregator,
        sweep_service,
        last_sweep: Arc::new(RwLock::new(None)),
    }
}

/// Production wiring: wall clock, plus the sweep scheduler in the background.
pub async fn build_app_state(
    db: Database,
    config: &Config,
) -> Result<AppState, Box<dyn std::error::Error>> {
    let time_service: Arc<dyn TimeService> = Arc::new(TokioTimeService::new());
    let task_spawner: Arc<dyn TaskSpawner> = Arc::new(TokioTaskSpawner::new());

    let state = build_services(db.clone(), &config.engine, time_service.clone());
    tracing::info!(
        "Distribution services initialized (stale after {}h, inactive after {}m, default capacity {})",
        config.engine.stale_assignment_hours,
        config.engine.inactivity_minutes,
        config.engine.default_max_chats
    );

    let distributed_lock: Arc<dyn DistributedLock> =
        Arc::new(DatabaseDistributedLock::new(db, time_service.clone()));
    let sweep_worker = SweepWorker::new(
        state.sweep_service.clone(),
        distributed_lock,
        time_service,
        state.last_sweep.clone(),
        Duration::from_secs(config.sweep_interval_minutes * 60),
    );
    task_spawner.spawn(Box::pin(async move {
        sweep_worker.run().await;
    }));
    tracing::info!(
        "Sweep worker started (every {} minutes)",
        config.sweep_interval_minutes
    );

    Ok(state)
}
