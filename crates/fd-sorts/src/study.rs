//! End-to-end signal study: fetch, lag, merge, sort.

use crate::{
    GroupSummary, PortfolioSort, Result, ReturnSource, SignalRegistry, SignalSource, SortConfig,
    SpreadSummary,
    panel::{align_returns, lag_signals, merge_panel, sign_adjust},
};
use polars::prelude::DataFrame;
use serde::Serialize;

/// Portfolio sort results for one signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalReport {
    /// Signal name
    pub signal: String,
    /// One summary per group, group 1 first
    pub groups: Vec<GroupSummary>,
    /// Top-minus-bottom spread, `None` when no period has both legs
    pub spread: Option<SpreadSummary>,
}

/// Runs portfolio sorts for a set of signals against a return history.
#[derive(Debug)]
pub struct SignalStudy<S, R> {
    signals: S,
    returns: R,
    config: SortConfig,
    registry: SignalRegistry,
}

impl<S: SignalSource, R: ReturnSource> SignalStudy<S, R> {
    /// Create a study using the default signal registry.
    pub fn new(signals: S, returns: R, config: SortConfig) -> Self {
        Self {
            signals,
            returns,
            config,
            registry: SignalRegistry::with_defaults(),
        }
    }

    /// Replace the registry used for sign adjustment.
    pub fn with_registry(mut self, registry: SignalRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Returns the current configuration.
    pub const fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Fetch both sources and build the merged panel for `names`.
    ///
    /// Signal periods are fetched `lag_months` earlier than the return range
    /// so the first return period has a signal to pair with.
    pub fn panel(&self, names: &[&str]) -> Result<DataFrame> {
        self.config.validate()?;
        let lag = self.config.lag_months;

        let signal_start = self.config.start.map(|p| p.add_months(-lag)).transpose()?;
        let signal_end = self.config.end.map(|p| p.add_months(-lag)).transpose()?;
        let mut signals = self
            .signals
            .fetch_signals(names, signal_start, signal_end)?;
        tracing::info!(rows = signals.height(), ?names, "fetched signals");

        if self.config.sign_adjust {
            signals = sign_adjust(&signals, &self.registry, names)?;
        }
        let signals = lag_signals(&signals, lag)?;

        let returns = self
            .returns
            .fetch_returns(self.config.start, self.config.end)?;
        tracing::info!(rows = returns.height(), "fetched returns");
        let returns = align_returns(&returns, self.config.anchor_day)?;

        merge_panel(&returns, &signals)
    }

    /// Sort on every signal in `names` and summarize.
    ///
    /// Any failure aborts the whole run.
    pub fn run(&self, names: &[&str]) -> Result<Vec<SignalReport>> {
        let panel = self.panel(names)?;
        let sort = PortfolioSort::with_config(self.config);

        names
            .iter()
            .map(|name| {
                let groups = sort.summarize(&panel, name)?;
                let spread = sort.long_short(&panel, name)?;
                if spread.is_none() {
                    tracing::warn!(signal = name, "no period with both extreme groups");
                }
                tracing::info!(signal = name, groups = groups.len(), "sorted signal");
                Ok(SignalReport {
                    signal: (*name).to_string(),
                    groups,
                    spread,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Period, SortError};
    use polars::prelude::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct FixedSignals {
        requested: RefCell<Option<(Option<Period>, Option<Period>)>>,
    }

    impl SignalSource for FixedSignals {
        fn fetch_signals(
            &self,
            names: &[&str],
            start: Option<Period>,
            end: Option<Period>,
        ) -> Result<DataFrame> {
            *self.requested.borrow_mut() = Some((start, end));
            assert_eq!(names, ["AssetGrowth"]);
            let ids: Vec<i64> = (1..=4).collect();
            Ok(df![
                "permno" => ids,
                "yyyymm" => [202312i32; 4],
                "AssetGrowth" => [0.4, 0.3, 0.2, 0.1],
            ]?)
        }
    }

    #[derive(Debug)]
    struct FixedReturns;

    impl ReturnSource for FixedReturns {
        fn fetch_returns(&self, _start: Option<Period>, _end: Option<Period>) -> Result<DataFrame> {
            let ids: Vec<i64> = (1..=4).collect();
            Ok(df![
                "permno" => ids,
                "date" => ["2024-01-31"; 4],
                "ret" => [1.0, 2.0, 3.0, 4.0],
            ]?)
        }
    }

    #[derive(Debug)]
    struct FailingReturns;

    impl ReturnSource for FailingReturns {
        fn fetch_returns(&self, _start: Option<Period>, _end: Option<Period>) -> Result<DataFrame> {
            Err(SortError::Io(std::io::Error::other("connection reset")))
        }
    }

    fn config(sign_adjust: bool) -> SortConfig {
        SortConfig {
            n_groups: 2,
            sign_adjust,
            start: Period::from_yyyymm(202401).ok(),
            end: Period::from_yyyymm(202401).ok(),
            ..SortConfig::default()
        }
    }

    #[test]
    fn test_fetches_lagged_signal_range() {
        let study = SignalStudy::new(FixedSignals::default(), FixedReturns, config(false));
        study.run(&["AssetGrowth"]).unwrap();

        let requested = study.signals.requested.borrow().unwrap();
        assert_eq!(requested.0.map(|p| p.yyyymm()), Some(202312));
        assert_eq!(requested.1.map(|p| p.yyyymm()), Some(202312));
    }

    #[test]
    fn test_raw_signal_sort() {
        let study = SignalStudy::new(FixedSignals::default(), FixedReturns, config(false));
        let reports = study.run(&["AssetGrowth"]).unwrap();
        assert_eq!(reports.len(), 1);

        // Low asset growth (entities 3, 4) is group 1
        let groups = &reports[0].groups;
        assert_eq!(groups.len(), 2);
        assert!((groups[0].mean_return - 3.5).abs() < 1e-12);
        assert!((groups[1].mean_return - 1.5).abs() < 1e-12);

        let spread = reports[0].spread.as_ref().unwrap();
        assert!((spread.mean_return + 2.0).abs() < 1e-12);
        assert_eq!(spread.n_periods, 1);
        assert!(spread.t_stat.is_none());
    }

    #[test]
    fn test_sign_adjusted_sort_flips_groups() {
        let study = SignalStudy::new(FixedSignals::default(), FixedReturns, config(true));
        let reports = study.run(&["AssetGrowth"]).unwrap();

        let groups = &reports[0].groups;
        assert!((groups[0].mean_return - 1.5).abs() < 1e-12);
        assert!((groups[1].mean_return - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_sign_adjust_requires_registered_signal() {
        let study = SignalStudy::new(FixedSignals::default(), FixedReturns, config(true))
            .with_registry(SignalRegistry::new());
        assert!(matches!(
            study.run(&["AssetGrowth"]),
            Err(SortError::UnknownSignal(_))
        ));
    }

    #[test]
    fn test_source_error_propagates() {
        let study = SignalStudy::new(FixedSignals::default(), FailingReturns, config(false));
        assert!(matches!(study.run(&["AssetGrowth"]), Err(SortError::Io(_))));
    }

    #[test]
    fn test_invalid_config_rejected_before_fetch() {
        let mut bad = config(false);
        bad.n_groups = 1;
        let study = SignalStudy::new(FixedSignals::default(), FixedReturns, bad);
        assert!(matches!(
            study.run(&["AssetGrowth"]),
            Err(SortError::InvalidConfiguration(_))
        ));
        assert!(study.signals.requested.borrow().is_none());
    }
}
