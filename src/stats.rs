use crate::models::YearlySummary;
use crate::view::Ranked;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Headline numbers shown above the country table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_population: f64,
    /// Distinct country names.
    pub countries: usize,
    /// `total_population / countries`, rounded; `0` when there are no countries.
    pub average_population: f64,
}

impl DashboardStats {
    /// Compute over the (filtered, unsorted) record set.
    pub fn from_records<T: Ranked>(rows: &[&T]) -> DashboardStats {
        let total_population: f64 = rows
            .iter()
            .map(|r| r.population())
            .filter(|p| p.is_finite())
            .sum();
        let countries = rows.iter().map(|r| r.name()).collect::<HashSet<_>>().len();
        let average_population = if countries > 0 {
            (total_population / countries as f64).round()
        } else {
            0.0
        };
        DashboardStats { total_population, countries, average_population }
    }
}

/// Summary statistics of one country's population series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub code: String,
    pub first_year: i32,
    pub last_year: i32,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Latest minus first population.
    pub change: f64,
    /// `change` relative to the first population, in percent; `None` if that was zero.
    pub change_pct: Option<f64>,
}

/// Statistics over a year-ordered series; `None` for an empty series.
pub fn series_stats(series: &[YearlySummary]) -> Option<SeriesStats> {
    let first = series.first()?;
    let last = series.last()?;

    let mut vals: Vec<f64> = series.iter().map(|s| s.population).collect();
    vals.sort_by(|a, b| a.total_cmp(b));
    let count = vals.len();
    let mean = vals.iter().copied().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        vals[count / 2]
    } else {
        (vals[count / 2 - 1] + vals[count / 2]) / 2.0
    };

    let change = last.population - first.population;
    let change_pct = (first.population != 0.0).then(|| change / first.population * 100.0);
    Some(SeriesStats {
        code: first.code.clone(),
        first_year: first.year,
        last_year: last.year,
        count,
        min: vals[0],
        max: vals[count - 1],
        mean,
        median,
        change,
        change_pct,
    })
}
