//! Background scheduling for the daily sync.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::providers::util::seconds_until;
use crate::sync::SyncPipeline;

/// Runs a full sync every day at `hour:minute` UTC until the handle is
/// dropped or aborted. A failed run is logged and the schedule continues.
pub fn spawn_daily_sync(
    pipeline: Arc<SyncPipeline>,
    hour: u32,
    minute: u32,
    limit: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait_secs = match seconds_until(hour, minute) {
                Ok(secs) => secs,
                Err(err) => {
                    error!("Daily sync disabled, invalid schedule: {err}");
                    return;
                }
            };
            info!(wait_secs, "Next sync scheduled");
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;

            info!("Starting scheduled sync");
            if let Err(err) = pipeline.sync_categories().await {
                error!("Scheduled category sync failed: {err}");
            }
            match pipeline.sync_funds(limit).await {
                Ok(report) => info!(
                    synced = report.synced,
                    failed = report.failed,
                    "Scheduled sync finished"
                ),
                Err(err) => error!("Scheduled sync failed: {err}"),
            }

            // Skip past the minute we just ran in.
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    })
}
