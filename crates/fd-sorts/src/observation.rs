//! Row-level observations of a merged signal/return panel.

use crate::Period;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column holding the entity identifier.
pub const ENTITY_COLUMN: &str = "permno";
/// Column holding the `yyyymm` period key.
pub const PERIOD_COLUMN: &str = "yyyymm";
/// Column holding the calendar date of a return, `YYYY-MM-DD`.
pub const DATE_COLUMN: &str = "date";
/// Column holding the percentage return.
pub const RETURN_COLUMN: &str = "ret";
/// Signal column name used when a panel is built from [`Observation`]s.
pub const SIGNAL_COLUMN: &str = "signal";

/// One entity in one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Stable security identifier
    pub entity_id: i64,
    /// Return period (signal already lagged)
    pub period: Period,
    /// Characteristic value, `None` when missing
    pub signal_value: Option<f64>,
    /// Percentage return
    pub return_value: f64,
}

impl Observation {
    /// Create an observation.
    pub const fn new(
        entity_id: i64,
        period: Period,
        signal_value: Option<f64>,
        return_value: f64,
    ) -> Self {
        Self {
            entity_id,
            period,
            signal_value,
            return_value,
        }
    }
}

/// Build a panel frame with columns `permno`, `yyyymm`, `signal`, `ret`.
///
/// NaN signals and returns become nulls, the same as empty CSV cells.
pub fn observations_to_frame(observations: &[Observation]) -> PolarsResult<DataFrame> {
    let ids: Vec<i64> = observations.iter().map(|o| o.entity_id).collect();
    let periods: Vec<i32> = observations.iter().map(|o| o.period.yyyymm()).collect();
    let signals: Vec<Option<f64>> = observations
        .iter()
        .map(|o| o.signal_value.filter(|v| !v.is_nan()))
        .collect();
    let returns: Vec<Option<f64>> = observations
        .iter()
        .map(|o| Some(o.return_value).filter(|v| !v.is_nan()))
        .collect();

    DataFrame::new(vec![
        Series::new(ENTITY_COLUMN.into(), ids).into(),
        Series::new(PERIOD_COLUMN.into(), periods).into(),
        Series::new(SIGNAL_COLUMN.into(), signals).into(),
        Series::new(RETURN_COLUMN.into(), returns).into(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations_to_frame() {
        let period = Period::from_yyyymm(202401).unwrap();
        let observations = vec![
            Observation::new(10001, period, Some(0.5), 1.2),
            Observation::new(10002, period, None, -0.4),
        ];

        let df = observations_to_frame(&observations).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 4);

        let signal = df.column(SIGNAL_COLUMN).unwrap().f64().unwrap();
        assert_eq!(signal.get(0), Some(0.5));
        assert_eq!(signal.get(1), None);

        let periods = df.column(PERIOD_COLUMN).unwrap().i32().unwrap();
        assert_eq!(periods.get(1), Some(202401));
    }

    #[test]
    fn test_nan_values_become_null() {
        let period = Period::from_yyyymm(202401).unwrap();
        let observations = vec![
            Observation::new(10001, period, Some(f64::NAN), 1.0),
            Observation::new(10002, period, Some(2.0), f64::NAN),
        ];

        let df = observations_to_frame(&observations).unwrap();
        let signal = df.column(SIGNAL_COLUMN).unwrap().f64().unwrap();
        let ret = df.column(RETURN_COLUMN).unwrap().f64().unwrap();
        assert_eq!(signal.get(0), None);
        assert_eq!(signal.get(1), Some(2.0));
        assert_eq!(ret.get(0), Some(1.0));
        assert_eq!(ret.get(1), None);
    }

    #[test]
    fn test_empty_observations() {
        let df = observations_to_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 4);
    }
}
