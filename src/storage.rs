use crate::models::{AgeBucket, CountrySummary, YearlySummary, format_number};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix text that a spreadsheet would evaluate as a formula.
fn sanitize(cell: &str) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{cell}"),
        _ => cell.to_string(),
    }
}

/// Save the country table as CSV with header.
pub fn save_countries_csv<P: AsRef<Path>>(rows: &[CountrySummary], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(["country", "code", "population", "male", "female"])?;
    for r in rows {
        wtr.write_record([
            sanitize(&r.country),
            sanitize(&r.code),
            format_number(r.population),
            r.male.clone(),
            r.female.clone(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save a country's yearly series as CSV with header.
pub fn save_series_csv<P: AsRef<Path>>(rows: &[YearlySummary], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(["country", "code", "year", "population", "male", "female"])?;
    for r in rows {
        wtr.write_record([
            sanitize(&r.country),
            sanitize(&r.code),
            r.year.to_string(),
            format_number(r.population),
            format!("{:.1}", r.male),
            format!("{:.1}", r.female),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the age histogram as CSV with header.
pub fn save_ages_csv<P: AsRef<Path>>(buckets: &[AgeBucket], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(["age", "population"])?;
    for b in buckets {
        wtr.write_record([b.age.to_string(), format_number(b.population)])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save records as pretty JSON array.
pub fn save_json<T: Serialize, P: AsRef<Path>>(records: &[T], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let s = serde_json::to_string_pretty(records)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_starters_are_quoted() {
        assert_eq!(sanitize("=1+1"), "'=1+1");
        assert_eq!(sanitize("@x"), "'@x");
        assert_eq!(sanitize("-5"), "'-5");
        assert_eq!(sanitize("Norway"), "Norway");
        assert_eq!(sanitize(""), "");
    }
}
