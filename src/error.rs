use reqwest::StatusCode;
use thiserror::Error;

/// All the ways a collection run can fail.  There is no retry anywhere;
/// a failed run is logged and the next scheduled run starts fresh.
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),

    #[error("invalid value '{value}' for setting {name}")]
    InvalidSetting { name: &'static str, value: String },

    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("got status {status} from {url}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("malformed usage statistics document: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("can't parse login timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] duckdb::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("job aborted: {0}")]
    Job(String),
}
