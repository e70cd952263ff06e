//! Signal and return sources.
//!
//! The two upstream providers (a signal-value service and a return-history
//! database) are collaborators behind the [`SignalSource`] and
//! [`ReturnSource`] traits. Both hand back polars frames in a fixed column
//! layout; the CSV implementations here read exports of those providers.

use crate::{
    ENTITY_COLUMN, PERIOD_COLUMN, Period, RETURN_COLUMN, Result, SortError,
    observation::DATE_COLUMN,
};
use polars::prelude::*;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Provider of firm-level signal values.
pub trait SignalSource: std::fmt::Debug {
    /// Fetch the named signals for periods in `[start, end]`.
    ///
    /// Returns a DataFrame with columns `permno` (i64), `yyyymm` (i32) and one
    /// f64 column per requested signal, in request order.
    fn fetch_signals(
        &self,
        names: &[&str],
        start: Option<Period>,
        end: Option<Period>,
    ) -> Result<DataFrame>;
}

/// Provider of monthly return histories.
pub trait ReturnSource: std::fmt::Debug {
    /// Fetch returns for periods in `[start, end]`.
    ///
    /// Returns a DataFrame with columns `permno` (i64), `date` (str,
    /// `YYYY-MM-DD`) and `ret` (f64, percent).
    fn fetch_returns(&self, start: Option<Period>, end: Option<Period>) -> Result<DataFrame>;
}

fn in_range(period: Period, start: Option<Period>, end: Option<Period>) -> bool {
    start.is_none_or(|s| period >= s) && end.is_none_or(|e| period <= e)
}

fn parse_value(cell: &str) -> Result<Option<f64>> {
    let cell = cell.trim();
    match cell {
        "" | "." | "NA" | "NaN" | "nan" => Ok(None),
        _ => cell
            .parse::<f64>()
            .map(|v| if v.is_nan() { None } else { Some(v) })
            .map_err(|e| SortError::Parse(format!("invalid number {cell:?}: {e}"))),
    }
}

/// Read a wide signal CSV (`permno, yyyymm, <signal columns...>`).
///
/// Only the requested signal columns are kept. Empty, `.`, `NA` and `NaN`
/// cells are missing values.
pub fn read_signal_csv<R: Read>(
    reader: R,
    names: &[&str],
    start: Option<Period>,
    end: Option<Period>,
) -> Result<DataFrame> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SortError::MissingColumn(name.to_string()))
    };
    let id_idx = position(ENTITY_COLUMN)?;
    let period_idx = position(PERIOD_COLUMN)?;
    let signal_idx = names
        .iter()
        .map(|name| position(name))
        .collect::<Result<Vec<_>>>()?;

    let mut ids: Vec<i64> = Vec::new();
    let mut periods: Vec<i32> = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

    for record in rdr.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let yyyymm: i32 = field(period_idx)
            .parse()
            .map_err(|e| SortError::Parse(format!("invalid yyyymm {:?}: {e}", field(period_idx))))?;
        let period = Period::from_yyyymm(yyyymm)?;
        if !in_range(period, start, end) {
            continue;
        }
        let id: i64 = field(id_idx)
            .parse()
            .map_err(|e| SortError::Parse(format!("invalid permno {:?}: {e}", field(id_idx))))?;

        ids.push(id);
        periods.push(yyyymm);
        for (column, &idx) in values.iter_mut().zip(&signal_idx) {
            column.push(parse_value(field(idx))?);
        }
    }

    let mut columns: Vec<Column> = vec![
        Series::new(ENTITY_COLUMN.into(), ids).into(),
        Series::new(PERIOD_COLUMN.into(), periods).into(),
    ];
    for (name, column) in names.iter().zip(values) {
        columns.push(Series::new((*name).into(), column).into());
    }

    let df = DataFrame::new(columns)?;
    tracing::debug!(rows = df.height(), signals = names.len(), "read signal csv");
    Ok(df)
}

#[derive(Debug, Deserialize)]
struct ReturnRow {
    permno: i64,
    date: String,
    ret: Option<f64>,
}

/// Read a return CSV (`permno, date, ret`), multiplying returns by `scale`.
///
/// Dates must be `YYYY-MM-DD`. Empty return cells are kept as missing.
pub fn read_return_csv<R: Read>(
    reader: R,
    scale: f64,
    start: Option<Period>,
    end: Option<Period>,
) -> Result<DataFrame> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut ids: Vec<i64> = Vec::new();
    let mut dates: Vec<String> = Vec::new();
    let mut returns: Vec<Option<f64>> = Vec::new();

    for row in rdr.deserialize() {
        let row: ReturnRow = row?;
        let date = chrono::NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d")
            .map_err(|e| SortError::Parse(format!("invalid date {:?}: {e}", row.date)))?;
        if !in_range(Period::from_date(date)?, start, end) {
            continue;
        }

        ids.push(row.permno);
        dates.push(date.format("%Y-%m-%d").to_string());
        returns.push(row.ret.filter(|r| !r.is_nan()).map(|r| r * scale));
    }

    let df = DataFrame::new(vec![
        Series::new(ENTITY_COLUMN.into(), ids).into(),
        Series::new(DATE_COLUMN.into(), dates).into(),
        Series::new(RETURN_COLUMN.into(), returns).into(),
    ])?;
    tracing::debug!(rows = df.height(), "read return csv");
    Ok(df)
}

/// Signal source backed by a wide CSV export.
#[derive(Debug, Clone)]
pub struct CsvSignalSource {
    path: PathBuf,
}

impl CsvSignalSource {
    /// Create a source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SignalSource for CsvSignalSource {
    fn fetch_signals(
        &self,
        names: &[&str],
        start: Option<Period>,
        end: Option<Period>,
    ) -> Result<DataFrame> {
        let file = std::fs::File::open(&self.path)?;
        read_signal_csv(file, names, start, end)
    }
}

/// Return source backed by a CSV export.
#[derive(Debug, Clone)]
pub struct CsvReturnSource {
    path: PathBuf,
    scale: f64,
}

impl CsvReturnSource {
    /// Create a source reading percentage returns from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            scale: 1.0,
        }
    }

    /// Multiply every return by `scale` (100 for decimal returns).
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Path of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReturnSource for CsvReturnSource {
    fn fetch_returns(&self, start: Option<Period>, end: Option<Period>) -> Result<DataFrame> {
        let file = std::fs::File::open(&self.path)?;
        read_return_csv(file, self.scale, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SIGNALS: &str = "\
permno,yyyymm,BM,AssetGrowth,Mom12m
10001,202312,0.5,0.10,
10002,202312,1.5,NA,0.2
10001,202401,0.6,.,0.1
";

    const RETURNS: &str = "\
permno,date,ret
10001,2024-01-31,0.012
10002,2024-01-31,
10001,2024-02-29,-0.020
";

    #[test]
    fn test_read_signal_csv() {
        let df = read_signal_csv(SIGNALS.as_bytes(), &["AssetGrowth", "BM"], None, None).unwrap();
        assert_eq!(df.height(), 3);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, ["permno", "yyyymm", "AssetGrowth", "BM"]);

        let growth = df.column("AssetGrowth").unwrap().f64().unwrap();
        assert_eq!(growth.get(0), Some(0.10));
        assert_eq!(growth.get(1), None);
        assert_eq!(growth.get(2), None);
    }

    #[test]
    fn test_read_signal_csv_range() {
        let start = Period::from_yyyymm(202401).ok();
        let df = read_signal_csv(SIGNALS.as_bytes(), &["BM"], start, None).unwrap();
        assert_eq!(df.height(), 1);
        let periods = df.column("yyyymm").unwrap().i32().unwrap();
        assert_eq!(periods.get(0), Some(202401));
    }

    #[test]
    fn test_read_signal_csv_missing_signal() {
        let result = read_signal_csv(SIGNALS.as_bytes(), &["GP"], None, None);
        assert!(matches!(result, Err(SortError::MissingColumn(name)) if name == "GP"));
    }

    #[test]
    fn test_read_signal_csv_bad_number() {
        let data = "permno,yyyymm,BM\n10001,202401,abc\n";
        let result = read_signal_csv(data.as_bytes(), &["BM"], None, None);
        assert!(matches!(result, Err(SortError::Parse(_))));
    }

    #[test]
    fn test_read_return_csv_scaled() {
        let df = read_return_csv(RETURNS.as_bytes(), 100.0, None, None).unwrap();
        assert_eq!(df.height(), 3);

        let ret = df.column("ret").unwrap().f64().unwrap();
        assert_relative_eq!(ret.get(0).unwrap(), 1.2, epsilon = 1e-12);
        assert_eq!(ret.get(1), None);
        assert_relative_eq!(ret.get(2).unwrap(), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_read_return_csv_range() {
        let end = Period::from_yyyymm(202401).ok();
        let df = read_return_csv(RETURNS.as_bytes(), 1.0, None, end).unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_read_return_csv_bad_date() {
        let data = "permno,date,ret\n10001,31/01/2024,0.01\n";
        let result = read_return_csv(data.as_bytes(), 1.0, None, None);
        assert!(matches!(result, Err(SortError::Parse(_))));
    }

    #[test]
    fn test_csv_source_missing_file() {
        let source = CsvSignalSource::new("/nonexistent/signals.csv");
        let result = source.fetch_signals(&["BM"], None, None);
        assert!(matches!(result, Err(SortError::Io(_))));
    }
}
