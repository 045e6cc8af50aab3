use crate::application::services::SweepService;
use crate::domain::entities::SweepReport;
use crate::domain::ports::{distributed_lock::DistributedLock, time_service::TimeService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

pub const SWEEP_LOCK_KEY: &str = "reconciliation_sweep";

/// Runs the reconciliation sweep on a fixed interval. Instances coordinate
/// through a leased lock so only one of them sweeps per tick.
pub struct SweepWorker {
    sweep_service: SweepService,
    distributed_lock: Arc<dyn DistributedLock>,
    time_service: Arc<dyn TimeService>,
    last_sweep: Arc<RwLock<Option<SweepReport>>>,
    interval: Duration,
    instance_id: String,
}

impl SweepWorker {
    pub fn new(
        sweep_service: SweepService,
        distributed_lock: Arc<dyn DistributedLock>,
        time_service: Arc<dyn TimeService>,
        last_sweep: Arc<RwLock<Option<SweepReport>>>,
        interval: Duration,
    ) -> Self {
        Self {
            sweep_service,
            distributed_lock,
            time_service,
            last_sweep,
            interval,
            instance_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub async fn run(&self) {
        info!(
            "Starting SweepWorker {} (every {} minutes)",
            self.instance_id,
            self.interval.as_secs() / 60
        );
        loop {
            self.run_once().await;
            self.time_service.sleep(self.interval).await;
        }
    }

    /// One tick. Returns the report when this instance held the lock and the
    /// company listing succeeded.
    pub async fn run_once(&self) -> Option<SweepReport> {
        // Lease outlives a normal sweep but lapses well before the next tick.
        let ttl = (self.interval.as_secs() / 2).max(60);

        match self
            .distributed_lock
            .acquire(SWEEP_LOCK_KEY, &self.instance_id, ttl)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                debug!("Sweep lock held by another instance, skipping this tick");
                return None;
            }
            Err(e) => {
                error!("Failed to check sweep lock: {}", e);
                return None;
            }
        }

        let report = match self.sweep_service.run_all().await {
            Ok(report) => {
                for company in report.companies.iter().filter(|c| !c.is_clean()) {
                    warn!(
                        "Sweep for company {} finished with errors: {:?}",
                        company.company_id, company.errors
                    );
                }
                *self.last_sweep.write().await = Some(report.clone());
                Some(report)
            }
            Err(e) => {
                error!("Failed to list companies for sweep: {}", e);
                None
            }
        };

        if let Err(e) = self
            .distributed_lock
            .release(SWEEP_LOCK_KEY, &self.instance_id)
            .await
        {
            warn!("Failed to release sweep lock: {}", e);
        }

        report
    }
}
