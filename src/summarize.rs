//! Pure transformations from raw API tables into summary records.
//!
//! - [`summarize_countries`]: one record per country **name**, percentages as display strings.
//! - [`summarize_series`]: one record per (GENC code, year), percentages as numbers, sorted by year.
//! - [`age_distribution`]: fixed 0..=100 single-year-of-age histogram.
//!
//! None of these fail. Malformed cells are coerced (see [`crate::models::Field`]) and
//! the `*_report` variants return a [`Coercions`] tally next to the records.

use crate::models::{
    AgeBucket, Cell, CountrySummary, CountryTotals, Field, RawTable, Sex, SexTotals, YearlySummary,
};
use ahash::AHashMap;
use log::{debug, warn};

/// Lowest and highest age bucket.
pub const AGE_MIN: u8 = 0;
pub const AGE_MAX: u8 = 100;

/// Header names the time-series summarizer resolves.
pub const SERIES_COLUMNS: [&str; 5] = ["NAME", "GENC", "YR", "POP", "SEX"];
/// Header names the age reducer resolves.
pub const AGE_COLUMNS: [&str; 3] = ["AGE", "POP", "SEX"];

/// Count of silent data-quality repairs made while summarizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coercions {
    /// Numeric cells that were malformed and counted as `0`.
    pub defaulted_cells: usize,
    /// Rows skipped entirely (too short, or no usable year/age).
    pub dropped_rows: usize,
    /// Rows whose sex discriminant was not 0, 1 or 2.
    pub unknown_sex: usize,
}

impl Coercions {
    pub fn is_clean(&self) -> bool {
        *self == Coercions::default()
    }
}

/// Records together with the repairs needed to produce them.
#[derive(Debug, Clone, PartialEq)]
pub struct Summarized<T> {
    pub records: Vec<T>,
    pub coercions: Coercions,
}

/// One-decimal text of `x`, rounding its exact binary value once, ties upward in
/// magnitude: `0.15` (stored as `0.1499…`) gives `"0.1"`, `12.25` gives `"12.3"`.
pub fn fixed1(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    let sign = if x < 0.0 { "-" } else { "" };
    // Digits well past any f64 mantissa; only the first two decimals are read.
    let exact = format!("{:.60}", x.abs());
    let (int_part, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let digit = |i: usize| frac.as_bytes().get(i).map_or(0, |b| u128::from(b - b'0'));
    let Some(tenths) = int_part
        .parse::<u128>()
        .ok()
        .and_then(|w| w.checked_mul(10))
        .and_then(|t| t.checked_add(digit(0) + u128::from(digit(1) >= 5)))
    else {
        return format!("{:.1}", x);
    };
    format!("{}{}.{}", sign, tenths / 10, tenths % 10)
}

/// [`fixed1`] read back as a number.
pub fn round1(x: f64) -> f64 {
    fixed1(x).parse().unwrap_or(0.0)
}

/// `part / total` as a one-decimal percent string, `"0%"` when `total` is not positive.
pub fn format_percent(part: f64, total: f64) -> String {
    if total > 0.0 {
        format!("{}%", fixed1(part / total * 100.0))
    } else {
        "0%".to_string()
    }
}

impl CountryTotals {
    pub fn to_summary(&self) -> CountrySummary {
        let total = self.totals.total();
        CountrySummary {
            country: self.country.clone(),
            code: self.code.clone(),
            population: total,
            male: format_percent(self.totals.male, total),
            female: format_percent(self.totals.female, total),
        }
    }
}

fn sex_of(cell: Option<&Cell>, coercions: &mut Coercions) -> Option<Sex> {
    let sex = cell
        .and_then(|c| c.number().valid())
        .and_then(Sex::from_code);
    if sex.is_none() {
        coercions.unknown_sex += 1;
    }
    sex
}

fn pop_of(cell: Option<&Cell>, coercions: &mut Coercions) -> f64 {
    let field = cell.map(Cell::number).unwrap_or(Field::Defaulted(0.0));
    if field.is_defaulted() {
        coercions.defaulted_cells += 1;
    }
    field.value()
}

/// Group rows by country name and accumulate population per sex.
///
/// Rows are read positionally as `[name, code, population, sex]`; the header is
/// not consulted. Groups keep the order in which countries first appear, and the
/// code of the first row seen for a name is kept.
pub fn country_totals(table: &RawTable) -> Summarized<CountryTotals> {
    let mut coercions = Coercions::default();
    let mut index: AHashMap<String, usize> = AHashMap::new();
    let mut out: Vec<CountryTotals> = Vec::new();

    for row in &table.rows {
        if row.len() < 4 {
            coercions.dropped_rows += 1;
            continue;
        }
        let country = row[0].text();
        let pop = pop_of(row.get(2), &mut coercions);
        let sex = sex_of(row.get(3), &mut coercions);

        let slot = *index.entry(country.clone()).or_insert_with(|| {
            out.push(CountryTotals {
                country,
                code: row[1].text(),
                totals: SexTotals::default(),
            });
            out.len() - 1
        });
        if let Some(sex) = sex {
            out[slot].totals.add(sex, pop);
        }
    }

    if !coercions.is_clean() {
        debug!("country summary: {} groups, {:?}", out.len(), coercions);
    }
    Summarized { records: out, coercions }
}

/// Country Summarizer, with its repair tally.
pub fn summarize_countries_report(table: &RawTable) -> Summarized<CountrySummary> {
    let Summarized { records, coercions } = country_totals(table);
    Summarized {
        records: records.iter().map(CountryTotals::to_summary).collect(),
        coercions,
    }
}

/// Country Summarizer: one [`CountrySummary`] per country name.
pub fn summarize_countries(table: &RawTable) -> Vec<CountrySummary> {
    summarize_countries_report(table).records
}

fn resolve_columns<const N: usize>(
    table: &RawTable,
    names: [&str; N],
    stage: &str,
) -> Option<[usize; N]> {
    let mut idx = [0usize; N];
    for (slot, name) in idx.iter_mut().zip(names) {
        match table.column(name) {
            Some(i) => *slot = i,
            None => {
                warn!("{stage}: column {name} missing from header {:?}", table.header);
                return None;
            }
        }
    }
    Some(idx)
}

/// Integral value of a cell, if it parses cleanly and has no fractional part.
fn whole_number(cell: Option<&Cell>) -> Option<i64> {
    cell.and_then(|c| c.number().valid())
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64)
}

/// Time-Series Summarizer, with its repair tally.
pub fn summarize_series_report(table: &RawTable) -> Summarized<YearlySummary> {
    let mut coercions = Coercions::default();
    let Some([i_name, i_code, i_year, i_pop, i_sex]) =
        resolve_columns(table, SERIES_COLUMNS, "time series")
    else {
        return Summarized { records: Vec::new(), coercions };
    };

    struct Group {
        country: String,
        code: String,
        year: i32,
        totals: SexTotals,
    }

    let mut index: AHashMap<(String, i32), usize> = AHashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in &table.rows {
        let Some(year) = whole_number(row.get(i_year)).and_then(|y| i32::try_from(y).ok()) else {
            coercions.dropped_rows += 1;
            continue;
        };
        let code = row.get(i_code).map(Cell::text).unwrap_or_default();
        let pop = pop_of(row.get(i_pop), &mut coercions);
        let sex = sex_of(row.get(i_sex), &mut coercions);

        let slot = *index.entry((code.clone(), year)).or_insert_with(|| {
            let country = match row.get(i_name) {
                Some(c) if !c.is_null() => c.text(),
                _ => code.clone(),
            };
            groups.push(Group {
                country,
                code,
                year,
                totals: SexTotals::default(),
            });
            groups.len() - 1
        });
        if let Some(sex) = sex {
            groups[slot].totals.add(sex, pop);
        }
    }

    let mut records: Vec<YearlySummary> = groups
        .into_iter()
        .map(|g| {
            let (male, female) = g.totals.shares().unwrap_or((0.0, 0.0));
            YearlySummary {
                country: g.country,
                code: g.code,
                year: g.year,
                population: g.totals.total(),
                male: round1(male),
                female: round1(female),
            }
        })
        .collect();
    records.sort_by_key(|r| r.year);

    if !coercions.is_clean() {
        debug!("time series: {} points, {:?}", records.len(), coercions);
    }
    Summarized { records, coercions }
}

/// Time-Series Summarizer: one [`YearlySummary`] per (code, year), ascending by year.
///
/// Returns an empty vector when any of [`SERIES_COLUMNS`] is missing from the header.
pub fn summarize_series(table: &RawTable) -> Vec<YearlySummary> {
    summarize_series_report(table).records
}

/// The most recent record of an ascending series.
pub fn latest(series: &[YearlySummary]) -> Option<&YearlySummary> {
    series.last()
}

/// Age Distribution Reducer, with its repair tally.
pub fn age_distribution_report(table: &RawTable) -> Summarized<AgeBucket> {
    let mut coercions = Coercions::default();
    let Some([i_age, i_pop, _i_sex]) = resolve_columns(table, AGE_COLUMNS, "age distribution")
    else {
        return Summarized { records: Vec::new(), coercions };
    };

    let mut sums = [0.0f64; AGE_MAX as usize + 1];
    for row in &table.rows {
        let age = whole_number(row.get(i_age))
            .filter(|a| (AGE_MIN as i64..=AGE_MAX as i64).contains(a));
        let Some(age) = age else {
            coercions.dropped_rows += 1;
            continue;
        };
        sums[age as usize] += pop_of(row.get(i_pop), &mut coercions);
    }

    let records = sums
        .iter()
        .enumerate()
        .map(|(age, &population)| AgeBucket { age: age as u8, population })
        .collect();
    Summarized { records, coercions }
}

/// Age Distribution Reducer: exactly 101 buckets for ages 0..=100.
///
/// Every row contributes to its age regardless of year or sex. Returns an empty
/// vector when any of [`AGE_COLUMNS`] is missing from the header.
pub fn age_distribution(table: &RawTable) -> Vec<AgeBucket> {
    age_distribution_report(table).records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(100.0, 250.0), "40.0%");
        assert_eq!(format_percent(1.0, 3.0), "33.3%");
        assert_eq!(format_percent(2.0, 3.0), "66.7%");
        assert_eq!(format_percent(5.0, 0.0), "0%");
        assert_eq!(format_percent(0.0, 10.0), "0.0%");
    }

    #[test]
    fn percent_rounds_the_stored_value_once() {
        // 3 / 2000 * 100 is stored just below 0.15, 19 / 2000 * 100 just below 0.95
        assert_eq!(format_percent(3.0, 2000.0), "0.1%");
        assert_eq!(format_percent(19.0, 2000.0), "0.9%");
        assert_eq!(round1(3.0 / 2000.0 * 100.0), 0.1);
        assert_eq!(fixed1(0.25), "0.3");
        assert_eq!(fixed1(-0.25), "-0.3");
        assert_eq!(fixed1(99.96), "100.0");
        assert_eq!(fixed1(7.0), "7.0");
    }

    #[test]
    fn round_half_up_on_exact_value() {
        assert_eq!(round1(12.25), 12.3);
        assert_eq!(round1(49.94), 49.9);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn whole_numbers_only() {
        assert_eq!(whole_number(Some(&Cell::from("2020"))), Some(2020));
        assert_eq!(whole_number(Some(&Cell::from("20.5"))), None);
        assert_eq!(whole_number(Some(&Cell::from("x"))), None);
        assert_eq!(whole_number(None), None);
    }
}
