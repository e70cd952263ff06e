//! Portfolio sort configuration.

use crate::{DEFAULT_ANCHOR_DAY, Period, Result, SortError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a signal portfolio sort.
///
/// Loadable from TOML; omitted keys take their defaults:
///
/// ```toml
/// n_groups = 5
/// lag_months = 1
/// anchor_day = 28
/// sign_adjust = true
/// start = 200001
/// end = 202312
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Number of quantile groups
    pub n_groups: usize,
    /// Months between signal period and return period
    pub lag_months: i32,
    /// Day-of-month used when rendering periods as dates
    pub anchor_day: u32,
    /// Multiply signals by their registered sign before sorting
    pub sign_adjust: bool,
    /// First return period (inclusive)
    pub start: Option<Period>,
    /// Last return period (inclusive)
    pub end: Option<Period>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            n_groups: 5,
            lag_months: 1,
            anchor_day: DEFAULT_ANCHOR_DAY,
            sign_adjust: false,
            start: None,
            end: None,
        }
    }
}

impl SortConfig {
    /// Default configuration with `n_groups` groups.
    pub fn with_groups(n_groups: usize) -> Self {
        Self {
            n_groups,
            ..Self::default()
        }
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check that the settings describe a valid sort.
    pub fn validate(&self) -> Result<()> {
        if self.n_groups < 2 {
            return Err(SortError::InvalidConfiguration(format!(
                "n_groups must be at least 2, got {}",
                self.n_groups
            )));
        }
        if !(1..=28).contains(&self.anchor_day) {
            return Err(SortError::InvalidConfiguration(format!(
                "anchor_day must be in 1..=28, got {}",
                self.anchor_day
            )));
        }
        if self.lag_months < 0 {
            return Err(SortError::InvalidConfiguration(format!(
                "lag_months must not be negative, got {}",
                self.lag_months
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(SortError::InvalidConfiguration(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(())
    }
}
