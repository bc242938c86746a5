use log::info;

use crate::catalog::CatalogClient;
use crate::csv_sink::write_login_timestamps;
use crate::error::StatsError;
use crate::settings::Settings;
use crate::store::{load_events, DuckDbUsageStore};

/// One pass of the extractor variant: fetch, flatten, snapshot to CSV.
pub fn run_extract_job(settings: &Settings) -> Result<(), StatsError> {
    let client = CatalogClient::from_settings(settings);
    let stats = client.fetch_usage_stats()?;
    let (path, count) = write_login_timestamps(
        &settings.output_folder,
        &settings.output_file_prefix,
        stats.login_events(),
    )?;
    info!("wrote {} login timestamps to {}", count, path.display());
    Ok(())
}

/// One pass of the loader variant: fetch, flatten, insert the events not
/// already in the usage events table.
pub fn run_load_job(settings: &Settings) -> Result<(), StatsError> {
    let environment = settings.require_environment_name()?;
    let database = settings.require_database()?;
    let client = CatalogClient::from_settings(settings);
    let stats = client.fetch_usage_stats()?;
    let mut store = DuckDbUsageStore::open(database)?;
    let outcome = load_events(&mut store, environment, stats.login_events())?;
    info!(
        "inserted {} new login events, skipped {} already recorded",
        outcome.inserted, outcome.skipped
    );
    Ok(())
}
