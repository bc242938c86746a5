use std::env;
use std::io::Write;
use std::path::PathBuf;

use log::LevelFilter;

use crate::error::StatsError;

/// Values recognized as `true` for boolean settings.
const TRUE_VALUES: [&str; 4] = ["true", "1", "on", "yes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// env_logger's default line format, with timestamps.
    Full,
    /// Bare `LEVEL [target] message` lines.
    Plain,
}

/// Process configuration, read from the environment once at startup and
/// passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the catalog service, e.g. `http://example.com:9085`.
    pub catalog_host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical name of the deployment whose events are recorded; required
    /// by the store variant, part of the de-duplication key.
    pub environment_name: Option<String>,
    /// Path of the DuckDB database; required by the store variant.
    pub database: Option<String>,
    pub output_folder: PathBuf,
    pub output_file_prefix: String,
    pub log_format: LogFormat,
    pub log_level: LevelFilter,
    /// When set, run the job once and exit instead of staying resident.
    pub run_and_exit: bool,
    pub sync_interval_hours: u64,
    pub version: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Settings, StatsError> {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key -> value source.  Tests pass a map here
    /// instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, StatsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format = match lookup("LOG_FORMAT") {
            None => LogFormat::Full,
            Some(value) => match value.to_lowercase().as_str() {
                "full" => LogFormat::Full,
                "plain" => LogFormat::Plain,
                _ => {
                    return Err(StatsError::InvalidSetting {
                        name: "LOG_FORMAT",
                        value,
                    })
                }
            },
        };
        let log_level = match lookup("LOG_LEVEL") {
            None => LevelFilter::Info,
            Some(value) => value.parse::<LevelFilter>().map_err(|_| {
                StatsError::InvalidSetting {
                    name: "LOG_LEVEL",
                    value,
                }
            })?,
        };
        let run_and_exit = match lookup("RUN_AND_EXIT") {
            None => false,
            Some(value) => TRUE_VALUES.contains(&value.to_lowercase().as_str()),
        };
        let sync_interval_hours = match lookup("SYNC_INTERVAL_HOURS") {
            None => 12,
            Some(value) => value.parse::<u64>().map_err(|_| {
                StatsError::InvalidSetting {
                    name: "SYNC_INTERVAL_HOURS",
                    value,
                }
            })?,
        };

        Ok(Settings {
            catalog_host: lookup("CATALOG_HOST")
                .unwrap_or_else(|| "http://example.com:9085".to_string()),
            username: lookup("USERNAME"),
            password: lookup("PASSWORD"),
            environment_name: lookup("ENVIRONMENT_NAME"),
            database: lookup("DB"),
            output_folder: lookup("OUTPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/data")),
            output_file_prefix: lookup("OUTPUT_FILE_PREFIX").unwrap_or_default(),
            log_format,
            log_level,
            run_and_exit,
            sync_interval_hours,
            version: lookup("VERSION"),
        })
    }

    pub fn require_database(&self) -> Result<&str, StatsError> {
        self.database
            .as_deref()
            .ok_or(StatsError::MissingSetting("DB"))
    }

    pub fn require_environment_name(&self) -> Result<&str, StatsError> {
        self.environment_name
            .as_deref()
            .ok_or(StatsError::MissingSetting("ENVIRONMENT_NAME"))
    }
}

/// Install the process-wide logger.  Called once, from main.
pub fn init_logging(settings: &Settings) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(settings.log_level);
    if settings.log_format == LogFormat::Plain {
        builder.format(|buf, record| {
            writeln!(buf, "{} [{}] {}", record.level(), record.target(), record.args())
        });
    }
    builder.init();
}
