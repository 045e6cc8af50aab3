use crate::application::services::{
    AssignmentService, AttendantRegistry, ChatIntakeService, CompanySettingsService,
    DistributionEngine, MetricsAggregator, SweepService,
};
use crate::domain::entities::SweepReport;
use crate::domain::ports::{event_bus::EventBus, time_service::TimeService};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub event_bus: Arc<dyn EventBus>,
    pub time_service: Arc<dyn TimeService>,
    pub attendant_registry: AttendantRegistry,
    pub assignment_service: AssignmentService,
    pub distribution_engine: DistributionEngine,
    pub intake_service: ChatIntakeService,
    pub company_service: CompanySettingsService,
    pub metrics_aggregator: MetricsAggregator,
    pub sweep_service: SweepService,
    /// Most recent sweep, from the scheduler or a manual trigger.
    pub last_sweep: Arc<RwLock<Option<SweepReport>>>,
}
