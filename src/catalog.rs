use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::eicstats::UsageStatsDocument;
use crate::error::StatsError;
use crate::settings::Settings;

/// Client for the catalog service's usage statistics endpoint.
pub struct CatalogClient {
    host: String,
    credentials: Option<(String, String)>,
}

impl CatalogClient {
    pub fn new(host: String, credentials: Option<(String, String)>) -> CatalogClient {
        CatalogClient { host, credentials }
    }

    /// Basic auth is used only when both username and password are set.
    pub fn from_settings(settings: &Settings) -> CatalogClient {
        let credentials = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                Some((username.clone(), password.clone()))
            }
            _ => None,
        };
        CatalogClient::new(settings.catalog_host.clone(), credentials)
    }

    /// Fetch and parse the current usage statistics.  The request has no
    /// timeout; a hung endpoint stalls the run until the process is killed.
    pub fn fetch_usage_stats(&self) -> Result<UsageStatsDocument, StatsError> {
        let url = format!("{}/access/1/catalog/eicstats", self.host);
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| http_error(&url, e))?;
        let mut builder = client.get(&url);
        if let Some((username, password)) = &self.credentials {
            builder = builder.basic_auth(username, Some(password));
        }
        let response = builder.send().map_err(|e| http_error(&url, e))?;
        if response.status() != StatusCode::OK {
            return Err(StatsError::HttpStatus {
                url,
                status: response.status(),
            });
        }
        let body = response.text().map_err(|e| http_error(&url, e))?;
        UsageStatsDocument::from_xml(&body)
    }
}

fn http_error(url: &str, source: reqwest::Error) -> StatsError {
    StatsError::Http {
        url: url.to_string(),
        source,
    }
}
