use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SweeperConfig;
use crate::db::{Store, now_timestamp};
use crate::services::OtpChannel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub otps_removed: u64,
    pub pending_removed: u64,
}

/// Periodically deletes expired OTP records and pending registrations.
#[derive(Clone)]
pub struct Sweeper {
    store: Store,
    otp: Arc<dyn OtpChannel>,
    config: SweeperConfig,
}

impl Sweeper {
    #[must_use]
    pub fn new(store: Store, otp: Arc<dyn OtpChannel>, config: SweeperConfig) -> Self {
        Self { store, otp, config }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport> {
        let otps_removed = self
            .otp
            .prune_expired()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to prune OTP records: {e}"))?;
        let pending_removed = self
            .store
            .prune_pending_registrations(&now_timestamp())
            .await?;

        Ok(SweepReport {
            otps_removed,
            pending_removed,
        })
    }

    /// Starts the cron job. Returns `None` when disabled; the caller owns
    /// the scheduler and shuts it down.
    pub async fn start(&self) -> Result<Option<JobScheduler>> {
        if !self.config.enabled {
            info!("Expiry sweeper is disabled in config");
            return Ok(None);
        }

        let sched = JobScheduler::new().await?;
        let sweeper = self.clone();

        let job = Job::new_async(self.config.cron_expression.as_str(), move |_uuid, _lock| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                let start = std::time::Instant::now();
                match sweeper.sweep_once().await {
                    Ok(report) => {
                        metrics::counter!("sweeper_removed_total", "kind" => "otp")
                            .increment(report.otps_removed);
                        metrics::counter!("sweeper_removed_total", "kind" => "pending")
                            .increment(report.pending_removed);
                        info!(
                            event = "job_finished",
                            job_name = "expiry_sweep",
                            otps_removed = report.otps_removed,
                            pending_removed = report.pending_removed,
                            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                            "Expiry sweep finished"
                        );
                    }
                    Err(e) => {
                        error!(event = "job_failed", job_name = "expiry_sweep", error = %e, "Expiry sweep failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Expiry sweeper running with cron: {}", self.config.cron_expression);
        Ok(Some(sched))
    }
}
