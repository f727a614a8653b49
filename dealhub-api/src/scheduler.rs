//! In-process price job scheduler
//!
//! Optional alternative to an external cron hitting `/api/cron/update-prices`.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::services::run_price_job;
use crate::AppState;

/// Run the price job every `period` until `shutdown` flips to `true`
///
/// The first run happens one full period after start.
pub fn spawn_price_job(state: AppState, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval() completes its first tick immediately
        ticker.tick().await;

        info!("Price job scheduled every {}s", period.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let result = run_price_job(
                        &state.db,
                        state.cache.as_ref(),
                        state.price_source.as_ref(),
                        state.settings.refresh_concurrency,
                    )
                    .await;

                    match result {
                        Ok(report) => info!(
                            "Scheduled price job done: {} refreshed, {} alerts triggered",
                            report.prices.successful, report.alerts.triggered
                        ),
                        Err(e) => error!("Scheduled price job failed: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Price job scheduler stopped");
                        break;
                    }
                }
            }
        }
    })
}
