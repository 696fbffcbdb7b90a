//! Search filter and multi-key ordering for summary tables.
//!
//! Inputs arrive as an immutable [`ViewInput`]; every change produces a fresh
//! [`View`]. Nothing here refetches data.

use crate::api::{DEFAULT_YEAR, IdbQuery};
use crate::models::{AgeRange, CountrySummary, CountryTotals, YearlySummary};
use crate::stats::DashboardStats;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Column a table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    Population,
    Male,
    Female,
    /// Lexicographic by country name; also the fallback ordering.
    Country,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A key plus direction, written as `population-desc`, `male-asc`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortMode {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortMode {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// The six modes offered by the dashboard, in menu order.
    pub const MENU: [SortMode; 6] = [
        SortMode::new(SortKey::Population, SortDirection::Desc),
        SortMode::new(SortKey::Population, SortDirection::Asc),
        SortMode::new(SortKey::Male, SortDirection::Desc),
        SortMode::new(SortKey::Male, SortDirection::Asc),
        SortMode::new(SortKey::Female, SortDirection::Desc),
        SortMode::new(SortKey::Female, SortDirection::Asc),
    ];

    /// Human label, e.g. "Male % (High → Low)".
    pub fn label(&self) -> String {
        let key = match self.key {
            SortKey::Population => "Total Population",
            SortKey::Male => "Male %",
            SortKey::Female => "Female %",
            SortKey::Country => "Country",
        };
        let dir = match (self.key, self.direction) {
            (SortKey::Country, SortDirection::Asc) => "A → Z",
            (SortKey::Country, SortDirection::Desc) => "Z → A",
            (_, SortDirection::Asc) => "Low → High",
            (_, SortDirection::Desc) => "High → Low",
        };
        format!("{key} ({dir})")
    }

    /// Parse a mode, falling back to country-name ordering for unknown input.
    pub fn parse_or_fallback(s: &str) -> SortMode {
        s.parse()
            .unwrap_or(SortMode::new(SortKey::Country, SortDirection::Asc))
    }
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::new(SortKey::Population, SortDirection::Desc)
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::Population => "population",
            SortKey::Male => "male",
            SortKey::Female => "female",
            SortKey::Country => "country",
        };
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{key}-{dir}")
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || {
            format!("unknown sort mode {s:?}, expected population|male|female|country followed by -asc or -desc")
        };
        let (k, d) = s.trim().rsplit_once('-').ok_or_else(bad)?;
        let key = match k.to_ascii_lowercase().as_str() {
            "population" => SortKey::Population,
            "male" => SortKey::Male,
            "female" => SortKey::Female,
            "country" | "name" => SortKey::Country,
            _ => return Err(bad()),
        };
        let direction = match d.to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(bad()),
        };
        Ok(SortMode { key, direction })
    }
}

/// Which sex share a percentage-keyed sort reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKey {
    Male,
    Female,
}

/// How a record stores a sex share.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Share<'a> {
    /// Pre-formatted display text such as `"48.5%"`.
    Text(&'a str),
    /// Already a percentage in `0..=100`.
    Percent(f64),
    /// Raw head count and the total it is a share of.
    Count { part: f64, total: f64 },
}

/// A record that can be filtered by name and ordered by population or sex share.
pub trait Ranked {
    fn name(&self) -> &str;
    fn population(&self) -> f64;
    fn share(&self, key: ShareKey) -> Share<'_>;
}

impl Ranked for CountrySummary {
    fn name(&self) -> &str {
        &self.country
    }
    fn population(&self) -> f64 {
        self.population
    }
    fn share(&self, key: ShareKey) -> Share<'_> {
        match key {
            ShareKey::Male => Share::Text(&self.male),
            ShareKey::Female => Share::Text(&self.female),
        }
    }
}

impl Ranked for YearlySummary {
    fn name(&self) -> &str {
        &self.country
    }
    fn population(&self) -> f64 {
        self.population
    }
    fn share(&self, key: ShareKey) -> Share<'_> {
        match key {
            ShareKey::Male => Share::Percent(self.male),
            ShareKey::Female => Share::Percent(self.female),
        }
    }
}

impl Ranked for CountryTotals {
    fn name(&self) -> &str {
        &self.country
    }
    fn population(&self) -> f64 {
        self.totals.total()
    }
    fn share(&self, key: ShareKey) -> Share<'_> {
        let part = match key {
            ShareKey::Male => self.totals.male,
            ShareKey::Female => self.totals.female,
        };
        Share::Count { part, total: self.totals.total() }
    }
}

/// Leading numeric literal of a percent string, e.g. `"48.5%"` → `48.5`.
///
/// Only strings containing `%` qualify.
pub fn parse_percent(s: &str) -> Option<f64> {
    if !s.contains('%') {
        return None;
    }
    let t = s.trim_start();
    let end = t
        .char_indices()
        .take_while(|&(i, c)| {
            c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    t[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Share as a percentage, never NaN: text first, then raw numbers, then
/// a ratio of counts, else `0`.
///
/// Text without `%` is read as a count of the item's population.
pub fn percentage_value<T: Ranked + ?Sized>(item: &T, key: ShareKey) -> f64 {
    match item.share(key) {
        Share::Text(s) => parse_percent(s)
            .or_else(|| {
                let part = s.trim().parse::<f64>().ok().filter(|n| n.is_finite())?;
                let population = item.population();
                (population.is_finite() && population > 0.0).then(|| part / population * 100.0)
            })
            .unwrap_or(0.0),
        Share::Percent(p) if p.is_finite() => p,
        Share::Count { part, total } if part.is_finite() && total.is_finite() && total > 0.0 => {
            part / total * 100.0
        }
        _ => 0.0,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn name_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Total order of two records under `mode`.
pub fn compare<T: Ranked + ?Sized>(a: &T, b: &T, mode: SortMode) -> Ordering {
    let ord = match mode.key {
        SortKey::Population => {
            finite_or_zero(a.population()).total_cmp(&finite_or_zero(b.population()))
        }
        SortKey::Male => {
            percentage_value(a, ShareKey::Male).total_cmp(&percentage_value(b, ShareKey::Male))
        }
        SortKey::Female => percentage_value(a, ShareKey::Female)
            .total_cmp(&percentage_value(b, ShareKey::Female)),
        SortKey::Country => name_cmp(a.name(), b.name()),
    };
    match mode.direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

/// Records whose name contains `query`, ignoring case. An empty query keeps everything.
pub fn filter_by_name<'a, T: Ranked>(items: &'a [T], query: &str) -> Vec<&'a T> {
    if query.is_empty() {
        return items.iter().collect();
    }
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|it| it.name().to_lowercase().contains(&needle))
        .collect()
}

/// Stable in-place sort by `mode`.
pub fn sort_records<T: Ranked + ?Sized>(items: &mut [&T], mode: SortMode) {
    items.sort_by(|a, b| compare(*a, *b, mode));
}

/// User-controlled dashboard state whose change requires a refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInput {
    pub year: i32,
    pub ages: AgeRange,
}

impl Default for QueryInput {
    fn default() -> Self {
        Self { year: DEFAULT_YEAR, ages: AgeRange::FULL }
    }
}

impl QueryInput {
    /// Same input with the age bounds swapped if entered backwards.
    pub fn normalized(self) -> Self {
        let AgeRange { min, max } = self.ages;
        Self {
            ages: AgeRange { min: min.min(max), max: max.max(min) },
            ..self
        }
    }

    pub fn to_query(&self) -> IdbQuery {
        IdbQuery::country_snapshot(self.year, self.ages)
    }
}

/// User-controlled table state that does not require a refetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewInput {
    pub search: String,
    pub sort: SortMode,
}

/// Filtered, sorted rows plus statistics of the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct View<'a, T> {
    pub rows: Vec<&'a T>,
    pub stats: DashboardStats,
}

impl ViewInput {
    pub fn new(search: impl Into<String>, sort: SortMode) -> Self {
        Self { search: search.into(), sort }
    }

    /// Filter, compute statistics over the filtered rows, then sort.
    pub fn apply<'a, T: Ranked>(&self, items: &'a [T]) -> View<'a, T> {
        let mut rows = filter_by_name(items, &self.search);
        let stats = DashboardStats::from_records(&rows);
        sort_records(&mut rows, self.sort);
        View { rows, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_input_defaults_and_normalizes() {
        let q = QueryInput::default();
        assert_eq!(q.year, DEFAULT_YEAR);
        assert_eq!(q.ages, AgeRange::FULL);
        let swapped = QueryInput { year: 2000, ages: AgeRange { min: 60, max: 15 } }.normalized();
        assert_eq!(swapped.ages, AgeRange { min: 15, max: 60 });
        assert!(swapped.to_query().to_query_string().contains("&YR=2000&AGE=15:60&"));
    }

    #[test]
    fn percent_prefix_parsing() {
        assert_eq!(parse_percent("48.5%"), Some(48.5));
        assert_eq!(parse_percent(" 0%"), Some(0.0));
        assert_eq!(parse_percent("12.3 %"), Some(12.3));
        assert_eq!(parse_percent("48.5"), None);
        assert_eq!(parse_percent("abc%"), None);
        assert_eq!(parse_percent("%"), None);
    }

    #[test]
    fn sort_mode_round_trips_through_text() {
        for m in SortMode::MENU {
            assert_eq!(m.to_string().parse::<SortMode>(), Ok(m));
        }
        assert!("size-desc".parse::<SortMode>().is_err());
        assert_eq!(
            SortMode::parse_or_fallback("size-desc"),
            SortMode::new(SortKey::Country, SortDirection::Asc)
        );
    }

    #[test]
    fn name_ordering_ignores_case_first() {
        assert_eq!(name_cmp("albania", "Belgium"), Ordering::Less);
        assert_eq!(name_cmp("Chad", "chad"), Ordering::Less);
    }
}
