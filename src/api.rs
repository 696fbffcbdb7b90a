//! Synchronous client for the **U.S. Census Bureau International Database (IDB)**.
//!
//! This module targets the `timeseries/idb/1year` endpoint and returns responses as
//! [`RawTable`]s: a header row naming the requested columns plus positional rows.
//!
//! ### Notes
//! - All cells come back as strings; conversion happens in `summarize`.
//! - The API answers **204 No Content** when a filter matches nothing; this is surfaced
//!   as `IdbError::NoData`.
//! - Transient failures (5xx, network) are retried with a short backoff.
//!
//! Typical usage:
//! ```no_run
//! # use idb_rs::{Client, AgeRange};
//! use idb_rs::summarize::summarize_countries;
//! let client = Client::default();
//! let table = client.fetch_snapshot(2023, AgeRange::FULL)?;
//! let rows = summarize_countries(&table);
//! # Ok::<(), idb_rs::IdbError>(())
//! ```

use crate::config::ClientConfig;
use crate::error::IdbError;
use crate::models::{AgeRange, RawTable, Sex, YearSpec};
use log::{debug, warn};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

/// Default span of the per-country history.
pub const HISTORY_YEARS: YearSpec = YearSpec::Range { start: 1950, end: 2025 };
/// Default year of the country snapshot.
pub const DEFAULT_YEAR: i32 = 2023;

const SNAPSHOT_COLUMNS: [&str; 4] = ["NAME", "GENC", "POP", "SEX"];
const HISTORY_COLUMNS: [&str; 6] = ["NAME", "GENC", "YR", "AGE", "POP", "SEX"];
/// Geography selector for a single country.
const COUNTRY_SELECTOR: &str = "genc+standard+countries+and+areas";

// Allow -, _, . unescaped in values
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string()
}

fn genc_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]{2,3}$").expect("static regex"))
}

/// Validate and normalise a GENC country code (`"no"` → `"NO"`).
pub fn normalize_code(code: &str) -> Result<String, IdbError> {
    let code = code.trim();
    if genc_pattern().is_match(code) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(IdbError::InvalidCode(code.to_string()))
    }
}

/// Parameters of one IDB request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdbQuery {
    pub columns: Vec<String>,
    pub years: YearSpec,
    pub ages: AgeRange,
    pub sexes: Vec<Sex>,
    /// GENC code; `None` requests every country.
    pub country: Option<String>,
}

impl IdbQuery {
    /// All countries for one year, rows `[NAME, GENC, POP, SEX]`.
    pub fn country_snapshot(year: i32, ages: AgeRange) -> Self {
        Self {
            columns: SNAPSHOT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            years: YearSpec::Year(year),
            ages,
            sexes: Sex::ALL.to_vec(),
            country: None,
        }
    }

    /// One country across `years`, rows `[NAME, GENC, YR, AGE, POP, SEX]` for ages 0..=100.
    pub fn country_history(code: &str, years: YearSpec) -> Result<Self, IdbError> {
        Ok(Self {
            columns: HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            years,
            ages: AgeRange::FULL,
            sexes: Sex::ALL.to_vec(),
            country: Some(normalize_code(code)?),
        })
    }

    /// Query string without the API key.
    pub fn to_query_string(&self) -> String {
        let cols = self
            .columns
            .iter()
            .map(|c| enc(c))
            .collect::<Vec<_>>()
            .join(",");
        let sexes = self
            .sexes
            .iter()
            .map(|s| s.code().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut q = format!(
            "get={}&YR={}&AGE={}&SEX={}",
            cols,
            self.years.to_query_param(),
            self.ages.to_query_param(),
            sexes
        );
        if let Some(code) = &self.country {
            q.push_str(&format!("&for={}:{}", COUNTRY_SELECTOR, enc(code)));
        }
        q
    }

    fn describe(&self) -> String {
        match &self.country {
            Some(code) => format!("{} ({})", code, self.years.to_query_param()),
            None => format!("all countries ({})", self.years.to_query_param()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    pub base_url: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Client::new(&ClientConfig::default()).expect("reqwest client build")
    }
}

impl Client {
    pub fn new(config: &ClientConfig) -> Result<Self, IdbError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs)) // total request timeout
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(concat!("idb_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IdbError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Full request URL, including the key when configured.
    pub fn query_url(&self, query: &IdbQuery) -> String {
        let mut url = format!("{}?{}", self.base_url, query.to_query_string());
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&key={}", enc(key)));
        }
        url
    }

    /// Same as [`Client::query_url`] but safe to log.
    pub fn redacted_url(&self, query: &IdbQuery) -> String {
        let mut url = format!("{}?{}", self.base_url, query.to_query_string());
        if self.api_key.is_some() {
            url.push_str("&key=***");
        }
        url
    }

    /// Run one query and decode the array-of-arrays body.
    ///
    /// ### Errors
    /// - `Transport`: network/HTTP error after retries
    /// - `Decode`: body is not JSON
    /// - `Shape`: JSON is not an IDB table
    /// - `NoData`: HTTP 204
    pub fn fetch_table(&self, query: &IdbQuery) -> Result<RawTable, IdbError> {
        let url = self.query_url(query);
        debug!("GET {}", self.redacted_url(query));

        // Small retry for transient failures (5xx / network errors)
        let mut last_err = String::from("no attempt made");
        for backoff_ms in [100u64, 300, 700] {
            match self.http.get(&url).send() {
                Ok(r) if r.status() == StatusCode::NO_CONTENT => {
                    return Err(IdbError::NoData(query.describe()));
                }
                Ok(r) if r.status().is_success() => {
                    let body = r.text().map_err(|e| IdbError::Transport(e.to_string()))?;
                    return decode_body(&body);
                }
                Ok(r) if r.status().is_server_error() => {
                    last_err = format!("HTTP {}", r.status());
                }
                Ok(r) => {
                    let status = r.status();
                    let detail = r.text().unwrap_or_default();
                    return Err(IdbError::Transport(format!(
                        "HTTP {} {}",
                        status,
                        detail.trim()
                    )));
                }
                Err(e) => last_err = e.to_string(),
            }
            warn!("request for {} failed ({}), retrying", query.describe(), last_err);
            std::thread::sleep(Duration::from_millis(backoff_ms));
        }
        Err(IdbError::Transport(last_err))
    }

    /// Dashboard data: every country for one year and age range.
    pub fn fetch_snapshot(&self, year: i32, ages: AgeRange) -> Result<RawTable, IdbError> {
        self.fetch_table(&IdbQuery::country_snapshot(year, ages))
    }

    /// Detail view data: one country over `years`. A table without data rows is `NoData`.
    pub fn fetch_history(&self, code: &str, years: YearSpec) -> Result<RawTable, IdbError> {
        let query = IdbQuery::country_history(code, years)?;
        let table = self.fetch_table(&query)?;
        if table.is_empty() {
            return Err(IdbError::NoData(query.describe()));
        }
        Ok(table)
    }
}

/// Decode a response body into a [`RawTable`].
pub fn decode_body(body: &str) -> Result<RawTable, IdbError> {
    let v: Value = serde_json::from_str(body).map_err(|e| IdbError::Decode(e.to_string()))?;
    RawTable::from_json(&v)
}
