//! idb_rs
//!
//! A Rust library for retrieving, summarizing, exporting and charting population
//! data from the U.S. Census Bureau **International Database (IDB)**. Pairs with the
//! `idb` CLI and the `idb-gui` desktop dashboard.
//!
//! ### Features
//! - Fetch a single-year snapshot of every country, or one country's history
//! - Reduce raw rows to per-country totals with male/female shares
//! - Per-year time series and single-year-of-age distributions
//! - Search and sort without refetching, with headline statistics
//! - Save as CSV or JSON, render SVG/PNG charts
//!
//! ### Example
//! ```no_run
//! use idb_rs::{AgeRange, Client, SortMode, ViewInput};
//! use idb_rs::summarize::summarize_countries;
//!
//! let client = Client::default();
//! let table = client.fetch_snapshot(2023, AgeRange::FULL)?;
//! let countries = summarize_countries(&table);
//! let view = ViewInput::new("nor", SortMode::default()).apply(&countries);
//! println!("{} countries, {} people", view.stats.countries, view.stats.total_population);
//! idb_rs::storage::save_countries_csv(&countries, "countries_2023.csv")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod stats;
pub mod storage;
pub mod summarize;
pub mod view;
pub mod viz;

pub use api::Client;
pub use config::ClientConfig;
pub use error::IdbError;
pub use models::{AgeBucket, AgeRange, CountrySummary, RawTable, Sex, YearSpec, YearlySummary};
pub use stats::DashboardStats;
pub use view::{QueryInput, SortMode, View, ViewInput};
