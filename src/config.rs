//! Settings for [`crate::api::Client`].

use serde::{Deserialize, Serialize};

/// Public endpoint of the IDB single-year-of-age dataset.
pub const DEFAULT_BASE_URL: &str = "https://api.census.gov/data/timeseries/idb/1year";

/// Environment variable holding the Census API key.
pub const API_KEY_ENV: &str = "CENSUS_API_KEY";
/// Environment variable overriding the endpoint.
pub const BASE_URL_ENV: &str = "IDB_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Optional; the API serves small volumes without a key.
    pub api_key: Option<String>,
    /// Total request timeout.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 5,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Blank keys are treated as absent.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
        self
    }
}
