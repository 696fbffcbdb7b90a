use crate::error::IdbError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Which years to request from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearSpec {
    /// Single year like 2023
    Year(i32),
    /// Inclusive range like 1950..=2025
    Range { start: i32, end: i32 },
}

impl YearSpec {
    pub fn to_query_param(&self) -> String {
        match *self {
            YearSpec::Year(y) => y.to_string(),
            YearSpec::Range { start, end } => format!("{}:{}", start, end),
        }
    }
}

impl FromStr for YearSpec {
    type Err = String;

    /// Accepts `YYYY` or `YYYY:YYYY`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("invalid year spec {s:?}, expected YYYY or YYYY:YYYY");
        match s.trim().split_once(':') {
            Some((a, b)) => {
                let start = a.trim().parse::<i32>().map_err(|_| bad())?;
                let end = b.trim().parse::<i32>().map_err(|_| bad())?;
                if start > end {
                    return Err(format!("start year {start} is after end year {end}"));
                }
                Ok(YearSpec::Range { start, end })
            }
            None => s.trim().parse::<i32>().map(YearSpec::Year).map_err(|_| bad()),
        }
    }
}

/// Inclusive age filter sent as `AGE=min:max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u8,
    pub max: u8,
}

impl AgeRange {
    pub const FULL: AgeRange = AgeRange { min: 0, max: 100 };

    pub fn to_query_param(&self) -> String {
        format!("{}:{}", self.min, self.max)
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self::FULL
    }
}

impl FromStr for AgeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || format!("invalid age range {s:?}, expected MIN:MAX within 0..=100");
        let (a, b) = s.trim().split_once(':').ok_or_else(bad)?;
        let min = a.trim().parse::<u8>().map_err(|_| bad())?;
        let max = b.trim().parse::<u8>().map_err(|_| bad())?;
        if min > max || max > 100 {
            return Err(bad());
        }
        Ok(AgeRange { min, max })
    }
}

/// Sex discriminant used by the IDB `SEX` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// Reported total of both sexes (code 0)
    Both,
    /// Code 1
    Male,
    /// Code 2
    Female,
}

impl Sex {
    pub const ALL: [Sex; 3] = [Sex::Both, Sex::Male, Sex::Female];

    pub fn code(self) -> u8 {
        match self {
            Sex::Both => 0,
            Sex::Male => 1,
            Sex::Female => 2,
        }
    }

    /// Map a numeric discriminant to a sex; anything outside `{0, 1, 2}` is unknown.
    pub fn from_code(code: f64) -> Option<Sex> {
        if code == 0.0 {
            Some(Sex::Both)
        } else if code == 1.0 {
            Some(Sex::Male)
        } else if code == 2.0 {
            Some(Sex::Female)
        } else {
            None
        }
    }
}

/// Outcome of reading one numeric cell.
///
/// Malformed input never fails: it degrades to a default value, but the
/// degradation stays visible so callers can count or report it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<T> {
    Valid(T),
    Defaulted(T),
}

impl<T: Copy> Field<T> {
    pub fn value(&self) -> T {
        match *self {
            Field::Valid(v) | Field::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Field::Defaulted(_))
    }

    /// The value only if it was parsed from well-formed input.
    pub fn valid(&self) -> Option<T> {
        match *self {
            Field::Valid(v) => Some(v),
            Field::Defaulted(_) => None,
        }
    }
}

/// One positional cell of an API row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Null,
    /// Nested arrays/objects or booleans; never numeric.
    Other(String),
}

impl Cell {
    fn from_value(v: &Value) -> Cell {
        match v {
            Value::String(s) => Cell::Text(s.clone()),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
            Value::Null => Cell::Null,
            other => Cell::Other(other.to_string()),
        }
    }

    /// Numeric coercion: finite numbers and numeric text are `Valid`,
    /// everything else becomes `Defaulted(0.0)`.
    pub fn number(&self) -> Field<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Field::Valid(*n),
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Field::Valid(n),
                _ => Field::Defaulted(0.0),
            },
            _ => Field::Defaulted(0.0),
        }
    }

    /// Cell rendered as display text (`Null` becomes an empty string).
    pub fn text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Null => String::new(),
            Cell::Other(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Render a number without a trailing `.0` for integral values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// A decoded API response: header row plus positional data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Data rows that were not arrays and were replaced by empty rows.
    pub malformed_rows: usize,
}

impl RawTable {
    /// Build a table from already-split rows (first row is the header).
    pub fn from_rows<I, R, C>(rows: I) -> RawTable
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        let mut it = rows.into_iter();
        let header = it
            .next()
            .map(|h| {
                h.into_iter()
                    .map(|c| Into::<Cell>::into(c).text().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let rows = it
            .map(|r| r.into_iter().map(Into::into).collect::<Vec<Cell>>())
            .collect();
        RawTable { header, rows, malformed_rows: 0 }
    }

    /// Decode the IDB array-of-arrays JSON shape.
    ///
    /// ### Errors
    /// `IdbError::Shape` when the value is not a non-empty array or row 0 is not an array.
    pub fn from_json(v: &Value) -> Result<RawTable, IdbError> {
        let arr = v
            .as_array()
            .ok_or_else(|| IdbError::Shape("not a top-level array".into()))?;
        let (first, rest) = arr
            .split_first()
            .ok_or_else(|| IdbError::Shape("empty array, no header row".into()))?;
        let header = first
            .as_array()
            .ok_or_else(|| IdbError::Shape("header row is not an array".into()))?
            .iter()
            .map(|h| Cell::from_value(h).text().trim().to_string())
            .collect();

        let mut malformed_rows = 0;
        let rows = rest
            .iter()
            .map(|r| match r.as_array() {
                Some(cells) => cells.iter().map(Cell::from_value).collect(),
                None => {
                    malformed_rows += 1;
                    Vec::new()
                }
            })
            .collect();
        Ok(RawTable { header, rows, malformed_rows })
    }

    /// Column position by header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromStr for RawTable {
    type Err = IdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: Value = serde_json::from_str(s).map_err(|e| IdbError::Decode(e.to_string()))?;
        RawTable::from_json(&v)
    }
}

/// Running population totals for one group, split by sex discriminant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SexTotals {
    pub both: f64,
    pub male: f64,
    pub female: f64,
}

impl SexTotals {
    pub fn add(&mut self, sex: Sex, pop: f64) {
        match sex {
            Sex::Both => self.both += pop,
            Sex::Male => self.male += pop,
            Sex::Female => self.female += pop,
        }
    }

    /// The reported total when present and non-zero, else male + female.
    pub fn total(&self) -> f64 {
        if self.both != 0.0 {
            self.both
        } else {
            self.male + self.female
        }
    }

    /// `(male %, female %)` of [`SexTotals::total`], `None` when the total is not positive.
    pub fn shares(&self) -> Option<(f64, f64)> {
        let total = self.total();
        if total > 0.0 {
            Some((self.male / total * 100.0, self.female / total * 100.0))
        } else {
            None
        }
    }
}

/// One row of the country table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    /// GENC code, the join key towards the detail view.
    pub code: String,
    pub population: f64,
    /// e.g. `"49.6%"`, or `"0%"` when the population is zero
    pub male: String,
    pub female: String,
}

/// Country-level raw totals before percentages are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryTotals {
    pub country: String,
    pub code: String,
    pub totals: SexTotals,
}

/// One (country, year) point of a time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlySummary {
    pub country: String,
    pub code: String,
    pub year: i32,
    pub population: f64,
    /// Percent in `0..=100`, rounded to one decimal place.
    pub male: f64,
    pub female: f64,
}

/// Population of one single year of age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub age: u8,
    pub population: f64,
}

impl fmt::Display for CountrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) population={} male={} female={}",
            self.country,
            self.code,
            format_number(self.population),
            self.male,
            self.female
        )
    }
}
