use std::error::Error;
use std::time::Duration;

use catstats::job::run_extract_job;
use catstats::scheduler::{run_scheduled, shutdown_signal};
use catstats::settings::{init_logging, Settings};
use log::{debug, info};

/// Pull login statistics from the catalog service and snapshot them to a
/// CSV file, once or on a fixed-hour interval.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env()?;
    init_logging(&settings);
    debug!(
        "catalog statistics extractor {}",
        settings.version.as_deref().unwrap_or("unversioned")
    );
    info!("RUN_AND_EXIT: {}", settings.run_and_exit);

    let interval = Duration::from_secs(settings.sync_interval_hours * 3600);
    let job_settings = settings.clone();
    run_scheduled(
        move || run_extract_job(&job_settings),
        interval,
        settings.run_and_exit,
        shutdown_signal(),
    )
    .await?;
    Ok(())
}
