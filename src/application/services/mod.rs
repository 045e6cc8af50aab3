pub mod assignment_service;
pub mod attendant_registry;
pub mod company_service;
pub mod distribution_engine;
pub mod intake_service;
pub mod metrics_service;
pub mod sweep_service;

pub use assignment_service::AssignmentService;
pub use attendant_registry::AttendantRegistry;
pub use company_service::CompanySettingsService;
pub use distribution_engine::DistributionEngine;
pub use intake_service::{ChatIntakeService, InboundResult};
pub use metrics_service::MetricsAggregator;
pub use sweep_service::SweepService;
