//! Panel preparation: sign adjustment, signal lag, date alignment and merge.
//!
//! Signals describe characteristic period P and only become usable for the
//! return of the following month(s). Returns are stamped with the last
//! trading day of a month, which varies, so both sides are keyed by `yyyymm`
//! before the join.

use crate::{
    DATE_COLUMN, ENTITY_COLUMN, PERIOD_COLUMN, Period, RETURN_COLUMN, Result, SignalRegistry,
    SortError,
};
use polars::prelude::*;

/// Fail with [`SortError::MissingColumn`] unless `df` has every column in `columns`.
pub(crate) fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for name in columns {
        if df.get_column_index(name).is_none() {
            return Err(SortError::MissingColumn((*name).to_string()));
        }
    }
    Ok(())
}

/// Multiply each named signal column by its registered sign.
///
/// After adjustment higher values always mean higher hypothesized returns.
pub fn sign_adjust(
    signals: &DataFrame,
    registry: &SignalRegistry,
    names: &[&str],
) -> Result<DataFrame> {
    require_columns(signals, names)?;

    let exprs = names
        .iter()
        .map(|name| {
            let sign = registry.sign(name)?;
            Ok((col(*name).cast(DataType::Float64) * lit(f64::from(sign))).alias(*name))
        })
        .collect::<Result<Vec<_>>>()?;

    let result = signals.clone().lazy().with_columns(exprs).collect()?;
    Ok(result)
}

/// Move every signal row forward by `months` periods.
///
/// A signal for period P ends up keyed to P + `months`, the first return
/// period in which it would have been known.
pub fn lag_signals(signals: &DataFrame, months: i32) -> Result<DataFrame> {
    require_columns(signals, &[PERIOD_COLUMN])?;

    let periods = signals
        .column(PERIOD_COLUMN)?
        .cast(&DataType::Int32)?;
    let shifted = periods
        .i32()?
        .into_iter()
        .map(|value| {
            value
                .map(|yyyymm| {
                    Period::from_yyyymm(yyyymm)
                        .and_then(|p| p.add_months(months))
                        .map(|p| p.yyyymm())
                })
                .transpose()
        })
        .collect::<Result<Vec<Option<i32>>>>()?;

    let mut result = signals.clone();
    let shifted: Column = Series::new(PERIOD_COLUMN.into(), shifted).into();
    result.with_column(shifted)?;

    tracing::debug!(rows = result.height(), months, "lagged signals");
    Ok(result)
}

/// Key returns by period and re-stamp their dates to `anchor_day`.
///
/// Adds a `yyyymm` column derived from `date` and rewrites `date` to the
/// anchor day of that month, so that `2024-02-29` and `2024-02-27` both
/// become `2024-02-28` for the default anchor.
pub fn align_returns(returns: &DataFrame, anchor_day: u32) -> Result<DataFrame> {
    require_columns(returns, &[ENTITY_COLUMN, DATE_COLUMN, RETURN_COLUMN])?;

    let dates = returns.column(DATE_COLUMN)?.str()?;
    let mut periods: Vec<i32> = Vec::with_capacity(dates.len());
    let mut anchored: Vec<String> = Vec::with_capacity(dates.len());

    for date in dates.into_iter() {
        let raw = date.ok_or_else(|| SortError::Parse("missing return date".to_string()))?;
        let parsed = chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| SortError::Parse(format!("invalid date {raw:?}: {e}")))?;
        let period = Period::from_date(parsed)?;
        periods.push(period.yyyymm());
        anchored.push(period.to_date(anchor_day)?.format("%Y-%m-%d").to_string());
    }

    let mut result = returns.clone();
    let anchored: Column = Series::new(DATE_COLUMN.into(), anchored).into();
    let periods: Column = Series::new(PERIOD_COLUMN.into(), periods).into();
    result.with_column(anchored)?;
    result.with_column(periods)?;

    Ok(result)
}

/// Left-join aligned returns with lagged signals on `(permno, yyyymm)`.
///
/// Every return row is kept; rows without a matching signal row get nulls in
/// the signal columns. The result is sorted by period, then entity.
pub fn merge_panel(returns: &DataFrame, signals: &DataFrame) -> Result<DataFrame> {
    require_columns(returns, &[ENTITY_COLUMN, PERIOD_COLUMN, RETURN_COLUMN])?;
    require_columns(signals, &[ENTITY_COLUMN, PERIOD_COLUMN])?;

    let keys = [
        col(ENTITY_COLUMN).cast(DataType::Int64),
        col(PERIOD_COLUMN).cast(DataType::Int32),
    ];
    let signals = signals.clone().lazy().with_columns(keys.clone());

    let duplicates = signals
        .clone()
        .group_by([col(ENTITY_COLUMN), col(PERIOD_COLUMN)])
        .agg([col(ENTITY_COLUMN).count().alias("n_rows")])
        .filter(col("n_rows").gt(lit(1)))
        .collect()?;
    if duplicates.height() > 0 {
        return Err(SortError::Computation(format!(
            "signals contain {} duplicate (permno, yyyymm) keys",
            duplicates.height()
        )));
    }

    let merged = returns
        .clone()
        .lazy()
        .with_columns(keys)
        .join(
            signals,
            [col(ENTITY_COLUMN), col(PERIOD_COLUMN)],
            [col(ENTITY_COLUMN), col(PERIOD_COLUMN)],
            JoinArgs::new(JoinType::Left),
        )
        .sort(
            [PERIOD_COLUMN, ENTITY_COLUMN],
            SortMultipleOptions::default(),
        )
        .collect()?;

    tracing::debug!(
        rows = merged.height(),
        returns = returns.height(),
        "merged returns with signals"
    );
    Ok(merged)
}
