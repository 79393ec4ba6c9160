//! Periodic recurring generation
//!
//! `easyfinance schedule` keeps the process alive and runs the generator on
//! a fixed interval (default every 24 hours, `[generation] schedule_hours`
//! in the config file). A failed run is logged and the next tick tries again.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

use easyfinance_core::{Config, Database};

use crate::commands::run_generation;

/// Spawn a task that runs generation every `period`
///
/// The first run happens immediately so occurrences due at startup are not
/// held back a full period.
pub fn start_generation_scheduler(db: Database, config: Config, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            info!("Running scheduled generation...");

            match run_generation(&db, &config, false, &Local::now()) {
                Ok(report) => {
                    info!(
                        "Scheduled generation completed: {} created",
                        report.generated_count()
                    );
                }
                Err(e) => {
                    error!("Scheduled generation failed: {:#}", e);
                }
            }
        }
    })
}

/// Run the scheduler in the foreground until ctrl+c
pub async fn run_until_interrupted(db: Database, config: Config, every_hours: u32) -> Result<()> {
    if every_hours == 0 {
        bail!("--every-hours must be at least 1");
    }

    info!("Starting generation scheduler: every {} hours", every_hours);
    println!("⏰ Generating recurring transactions every {} hours (ctrl+c to stop)", every_hours);

    let handle = start_generation_scheduler(
        db,
        config,
        Duration::from_secs(u64::from(every_hours) * 3600),
    );

    tokio::signal::ctrl_c().await?;
    handle.abort();
    info!("Scheduler stopped");

    Ok(())
}
