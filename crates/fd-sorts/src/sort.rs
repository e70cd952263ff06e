//! Quantile portfolio sorts.
//!
//! Within every period, observations with a signal value are ranked and cut
//! into `n_groups` equal-count groups: group 1 holds the lowest signal values,
//! group `n_groups` the highest. Group returns are averaged per period, then
//! summarized across periods.
//!
//! # Ties
//!
//! Ranks are ordinal. Rows are ordered by `(signal, permno)` ascending, so
//! equal signal values are ranked by ascending entity id and a tie can be
//! split across a group boundary. Rank `r` out of `m` lands in group
//! `floor((r - 1) * n_groups / m) + 1`, which gives every group either
//! `floor(m / n_groups)` or `ceil(m / n_groups)` members.

use crate::{
    ENTITY_COLUMN, Observation, PERIOD_COLUMN, Period, RETURN_COLUMN, Result, SIGNAL_COLUMN,
    SortConfig, SortError, observation::observations_to_frame, panel::require_columns,
};
use polars::prelude::*;
use serde::Serialize;

/// Column holding the assigned group, `1..=n_groups`.
pub const GROUP_COLUMN: &str = "port";
/// Column holding the number of entities in a period-group.
pub const COUNT_COLUMN: &str = "n_firms";

/// Summary of one portfolio group across all periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Group label, `1..=n_groups`
    pub group: i32,
    /// Mean of the per-period group returns
    pub mean_return: f64,
    /// Sample standard deviation of the per-period group returns
    pub std_return: Option<f64>,
    /// Average number of entities per period
    pub avg_n_firms: f64,
    /// Number of periods in which the group was formed
    pub n_periods: usize,
    /// First period covered
    pub first_period: Period,
    /// Last period covered
    pub last_period: Period,
}

/// Long-short spread: group `n_groups` minus group 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadSummary {
    /// Mean spread
    pub mean_return: f64,
    /// Sample standard deviation of the spread
    pub std_return: Option<f64>,
    /// `mean / (std / sqrt(n))`
    pub t_stat: Option<f64>,
    /// Number of periods with both legs formed
    pub n_periods: usize,
    /// First period covered
    pub first_period: Period,
    /// Last period covered
    pub last_period: Period,
}

/// Sort observations into `n_groups` portfolios and summarize each group.
///
/// Fails with [`SortError::InvalidConfiguration`] when `n_groups < 2` and
/// with [`SortError::InsufficientData`] when some period has fewer signal
/// values than groups. Empty input gives an empty summary.
///
/// # Example
///
/// ```rust,ignore
/// use fd_sorts::{Observation, Period, summarize};
///
/// let period = Period::from_yyyymm(202401)?;
/// let observations: Vec<_> = (1..=10)
///     .map(|i| Observation::new(i, period, Some(i as f64), i as f64 / 10.0))
///     .collect();
///
/// let groups = summarize(&observations, 5)?;
/// assert_eq!(groups.len(), 5);
/// ```
pub fn summarize(observations: &[Observation], n_groups: usize) -> Result<Vec<GroupSummary>> {
    let sort = PortfolioSort::new(n_groups);
    sort.config().validate()?;

    let panel = observations_to_frame(observations)?;
    sort.summarize(&panel, SIGNAL_COLUMN)
}

/// Quantile portfolio sort over a merged panel frame.
///
/// The panel must carry `permno`, `yyyymm`, `ret` and the signal column.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSort {
    config: SortConfig,
}

impl PortfolioSort {
    /// Sort into `n_groups` groups with default settings otherwise.
    pub fn new(n_groups: usize) -> Self {
        Self::with_config(SortConfig::with_groups(n_groups))
    }

    /// Create a sort from a configuration.
    pub const fn with_config(config: SortConfig) -> Self {
        Self { config }
    }

    /// Returns the current configuration.
    pub const fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Number of groups.
    pub const fn n_groups(&self) -> usize {
        self.config.n_groups
    }

    /// Cast signal and return to floats and treat NaN as missing.
    fn cleaned(panel: &DataFrame, signal: &str) -> LazyFrame {
        panel.clone().lazy().with_columns([
            col(signal)
                .cast(DataType::Float64)
                .fill_nan(lit(NULL))
                .alias(signal),
            col(RETURN_COLUMN)
                .cast(DataType::Float64)
                .fill_nan(lit(NULL))
                .alias(RETURN_COLUMN),
        ])
    }

    fn validate(&self, panel: &DataFrame, signal: &str) -> Result<()> {
        self.config.validate()?;
        require_columns(panel, &[ENTITY_COLUMN, PERIOD_COLUMN, RETURN_COLUMN, signal])?;
        self.check_period_counts(panel, signal)
    }

    /// Reject any period with at least one but fewer than `n_groups` signal values.
    fn check_period_counts(&self, panel: &DataFrame, signal: &str) -> Result<()> {
        let counts = Self::cleaned(panel, signal)
            .filter(col(signal).is_not_null())
            .group_by([col(PERIOD_COLUMN)])
            .agg([col(signal).count().alias("n_obs")])
            .sort([PERIOD_COLUMN], SortMultipleOptions::default())
            .collect()?;

        let periods = counts.column(PERIOD_COLUMN)?.cast(&DataType::Int32)?;
        let n_obs = counts.column("n_obs")?.cast(&DataType::UInt64)?;

        for (period, available) in periods.i32()?.into_iter().zip(n_obs.u64()?.into_iter()) {
            let (Some(period), Some(available)) = (period, available) else {
                continue;
            };
            let available = available as usize;
            if available < self.config.n_groups {
                return Err(SortError::InsufficientData {
                    period: Period::from_yyyymm(period)?,
                    required: self.config.n_groups,
                    available,
                });
            }
        }

        Ok(())
    }

    /// Assign every row a group label in the `port` column.
    ///
    /// Rows with a missing or NaN signal get a null group, and NaN returns
    /// come back as nulls. The result is sorted by period, then entity.
    pub fn assign(&self, panel: &DataFrame, signal: &str) -> Result<DataFrame> {
        self.validate(panel, signal)?;
        self.assign_unchecked(panel, signal)
    }

    fn assign_unchecked(&self, panel: &DataFrame, signal: &str) -> Result<DataFrame> {
        let n_groups = self.config.n_groups as f64;
        let ordered = Self::cleaned(panel, signal).sort(
                [PERIOD_COLUMN, signal, ENTITY_COLUMN],
                SortMultipleOptions::default(),
            );

        // Rows of a period are contiguous and ordered by (signal, permno), so
        // the offset from the period's first row is the ordinal rank.
        let ranked = ordered
            .clone()
            .filter(col(signal).is_not_null())
            .with_row_index("row", None)
            .with_columns([
                (col("row").cast(DataType::Float64)
                    - col("row").min().over([col(PERIOD_COLUMN)]).cast(DataType::Float64))
                .alias("rank"),
                col(signal)
                    .count()
                    .over([col(PERIOD_COLUMN)])
                    .cast(DataType::Float64)
                    .alias("n_obs"),
            ])
            .with_column(
                (((col("rank") * lit(n_groups)) / col("n_obs")).cast(DataType::Int32) + lit(1))
                    .cast(DataType::Int32)
                    .alias(GROUP_COLUMN),
            )
            .drop(["row", "rank", "n_obs"]);

        let unranked = ordered
            .filter(col(signal).is_null())
            .with_column(lit(NULL).cast(DataType::Int32).alias(GROUP_COLUMN));

        let result = concat([ranked, unranked], UnionArgs::default())?
            .sort(
                [PERIOD_COLUMN, ENTITY_COLUMN],
                SortMultipleOptions::default(),
            )
            .collect()?;

        Ok(result)
    }

    /// Mean return and entity count per (period, group).
    ///
    /// Returns a DataFrame with columns `yyyymm`, `port`, `ret`, `n_firms`,
    /// sorted by period and group. Rows with a missing signal or a missing
    /// return do not contribute.
    pub fn period_returns(&self, panel: &DataFrame, signal: &str) -> Result<DataFrame> {
        let assigned = self.assign(panel, signal)?;

        let result = assigned
            .lazy()
            .filter(col(GROUP_COLUMN).is_not_null())
            .filter(col(RETURN_COLUMN).is_not_null())
            .group_by([col(PERIOD_COLUMN), col(GROUP_COLUMN)])
            .agg([
                col(RETURN_COLUMN).mean().alias(RETURN_COLUMN),
                col(ENTITY_COLUMN).count().alias(COUNT_COLUMN),
            ])
            .sort(
                [PERIOD_COLUMN, GROUP_COLUMN],
                SortMultipleOptions::default(),
            )
            .collect()?;

        tracing::debug!(
            signal,
            rows = result.height(),
            n_groups = self.config.n_groups,
            "computed period group returns"
        );
        Ok(result)
    }

    /// Per-group summary across periods as a DataFrame.
    ///
    /// Columns: `port`, `mean_ret`, `std_ret`, `avg_n_firms`, `n_periods`,
    /// `first_period`, `last_period`; one row per group, sorted by group.
    pub fn summarize_frame(&self, panel: &DataFrame, signal: &str) -> Result<DataFrame> {
        let period_returns = self.period_returns(panel, signal)?;

        let result = period_returns
            .lazy()
            .group_by([col(GROUP_COLUMN)])
            .agg([
                col(RETURN_COLUMN).mean().alias("mean_ret"),
                col(RETURN_COLUMN).std(1).alias("std_ret"),
                col(COUNT_COLUMN)
                    .cast(DataType::Float64)
                    .mean()
                    .alias("avg_n_firms"),
                col(RETURN_COLUMN).count().alias("n_periods"),
                col(PERIOD_COLUMN).min().alias("first_period"),
                col(PERIOD_COLUMN).max().alias("last_period"),
            ])
            .sort([GROUP_COLUMN], SortMultipleOptions::default())
            .collect()?;

        Ok(result)
    }

    /// Per-group summary across periods.
    pub fn summarize(&self, panel: &DataFrame, signal: &str) -> Result<Vec<GroupSummary>> {
        let summary = self.summarize_frame(panel, signal)?;

        let groups = summary.column(GROUP_COLUMN)?.cast(&DataType::Int32)?;
        let mean = summary.column("mean_ret")?.f64()?;
        let std_ret = summary.column("std_ret")?.f64()?;
        let avg_n = summary.column("avg_n_firms")?.f64()?;
        let n_periods = summary.column("n_periods")?.cast(&DataType::UInt64)?;
        let first = summary.column("first_period")?.cast(&DataType::Int32)?;
        let last = summary.column("last_period")?.cast(&DataType::Int32)?;

        let (groups, n_periods, first, last) =
            (groups.i32()?, n_periods.u64()?, first.i32()?, last.i32()?);

        let missing = |name: &str| SortError::Computation(format!("null {name} in summary"));

        (0..summary.height())
            .map(|i| {
                Ok(GroupSummary {
                    group: groups.get(i).ok_or_else(|| missing("group"))?,
                    mean_return: mean.get(i).ok_or_else(|| missing("mean_ret"))?,
                    std_return: std_ret.get(i).filter(|v| v.is_finite()),
                    avg_n_firms: avg_n.get(i).ok_or_else(|| missing("avg_n_firms"))?,
                    n_periods: n_periods.get(i).ok_or_else(|| missing("n_periods"))? as usize,
                    first_period: Period::from_yyyymm(
                        first.get(i).ok_or_else(|| missing("first_period"))?,
                    )?,
                    last_period: Period::from_yyyymm(
                        last.get(i).ok_or_else(|| missing("last_period"))?,
                    )?,
                })
            })
            .collect()
    }

    /// Per-period long-short spread, group `n_groups` minus group 1.
    ///
    /// Returns a DataFrame with columns `yyyymm`, `long`, `short`, `spread`.
    /// Periods missing either leg are dropped.
    pub fn spread_series(&self, panel: &DataFrame, signal: &str) -> Result<DataFrame> {
        let period_returns = self.period_returns(panel, signal)?.lazy();
        let top = self.config.n_groups as i32;

        let long = period_returns
            .clone()
            .filter(col(GROUP_COLUMN).eq(lit(top)))
            .select([col(PERIOD_COLUMN), col(RETURN_COLUMN).alias("long")]);
        let short = period_returns
            .filter(col(GROUP_COLUMN).eq(lit(1)))
            .select([col(PERIOD_COLUMN), col(RETURN_COLUMN).alias("short")]);

        let result = long
            .join(
                short,
                [col(PERIOD_COLUMN)],
                [col(PERIOD_COLUMN)],
                JoinArgs::new(JoinType::Inner),
            )
            .with_column((col("long") - col("short")).alias("spread"))
            .sort([PERIOD_COLUMN], SortMultipleOptions::default())
            .collect()?;

        Ok(result)
    }

    /// Long-short spread summary, or `None` when no period has both legs.
    pub fn long_short(&self, panel: &DataFrame, signal: &str) -> Result<Option<SpreadSummary>> {
        let series = self.spread_series(panel, signal)?;
        if series.height() == 0 {
            return Ok(None);
        }

        let stats = series
            .clone()
            .lazy()
            .select([
                col("spread").mean().alias("mean"),
                col("spread").std(1).alias("std"),
                col(PERIOD_COLUMN).min().alias("first_period"),
                col(PERIOD_COLUMN).max().alias("last_period"),
            ])
            .collect()?;

        let mean = stats
            .column("mean")?
            .f64()?
            .get(0)
            .ok_or_else(|| SortError::Computation("null spread mean".to_string()))?;
        let std_ret = stats.column("std")?.f64()?.get(0).filter(|v| v.is_finite());
        let first = stats.column("first_period")?.cast(&DataType::Int32)?;
        let last = stats.column("last_period")?.cast(&DataType::Int32)?;
        let period_at = |column: &Column| -> Result<Period> {
            let yyyymm = column
                .i32()?
                .get(0)
                .ok_or_else(|| SortError::Computation("null spread period".to_string()))?;
            Period::from_yyyymm(yyyymm)
        };

        let n_periods = series.height();
        let t_stat = std_ret
            .filter(|s| *s > 0.0)
            .map(|s| mean / (s / (n_periods as f64).sqrt()));

        Ok(Some(SpreadSummary {
            mean_return: mean,
            std_return: std_ret,
            t_stat,
            n_periods,
            first_period: period_at(&first)?,
            last_period: period_at(&last)?,
        }))
    }
}
