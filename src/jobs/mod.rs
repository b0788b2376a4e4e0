use std::{sync::Arc, time::Instant};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

use crate::metrics;

pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        tokio::spawn(Self::capability_cache_purge_job(Arc::clone(&self)));
        tokio::spawn(Self::uptime_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Purge expired capability entries (runs every 30 minutes)
    async fn capability_cache_purge_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(1800));

        loop {
            interval.tick().await;
            let start = Instant::now();

            match tasks::purge_capability_cache(&scheduler.context).await {
                Ok(count) => {
                    metrics::record_background_job(
                        "capability_cache_purge",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Purged {} expired capability entries", count);
                    }
                }
                Err(e) => {
                    metrics::record_background_job(
                        "capability_cache_purge",
                        "failure",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to purge capability cache: {}", e);
                }
            }
        }
    }

    /// Uptime gauge (runs every 15 seconds)
    async fn uptime_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(15));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::update_uptime(&scheduler.context).await {
                debug!("Failed to update uptime: {}", e);
            }
        }
    }
}
