//! Monthly period key.
//!
//! Signals are published per `yyyymm` month and returns carry calendar dates
//! whose day-of-month varies (last trading day). Both are mapped onto a
//! [`Period`] so they can be joined, and a period can be rendered back to a
//! calendar date at a fixed anchor day for display.

use crate::{Result, SortError};
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Default day-of-month used when rendering a period as a date.
pub const DEFAULT_ANCHOR_DAY: u32 = 28;

/// Earliest representable year.
pub const MIN_YEAR: i32 = 1;
/// Latest representable year.
pub const MAX_YEAR: i32 = 9999;

/// A calendar month.
///
/// Orders chronologically. Serializes as its `yyyymm` integer. Years are
/// limited to [`MIN_YEAR`]`..=`[`MAX_YEAR`].
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{year:04}-{month:02}")]
#[serde(into = "i32", try_from = "i32")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period, rejecting months outside `1..=12` and years outside
    /// [`MIN_YEAR`]`..=`[`MAX_YEAR`].
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            let month = i32::try_from(month).unwrap_or(i32::MAX);
            return Err(SortError::InvalidPeriod(
                year.saturating_mul(100).saturating_add(month),
            ));
        }
        Ok(Self { year, month })
    }

    /// Parse a `yyyymm` integer such as `202401`.
    pub fn from_yyyymm(yyyymm: i32) -> Result<Self> {
        let year = yyyymm.div_euclid(100);
        let month = yyyymm.rem_euclid(100);
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(SortError::InvalidPeriod(yyyymm));
        }
        Ok(Self {
            year,
            month: month as u32,
        })
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Result<Self> {
        Self::new(date.year(), date.month())
    }

    /// Integer `yyyymm` form.
    pub const fn yyyymm(&self) -> i32 {
        self.year * 100 + self.month as i32
    }

    /// Calendar year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, `1..=12`.
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Shift by `months` calendar months, or `None` when the result leaves
    /// the supported year range.
    pub const fn checked_add_months(&self, months: i32) -> Option<Self> {
        let index = self.year as i64 * 12 + (self.month as i64 - 1) + months as i64;
        let year = index.div_euclid(12);
        if year < MIN_YEAR as i64 || year > MAX_YEAR as i64 {
            return None;
        }
        Some(Self {
            year: year as i32,
            month: index.rem_euclid(12) as u32 + 1,
        })
    }

    /// Shift by `months` calendar months (negative moves backwards).
    pub fn add_months(&self, months: i32) -> Result<Self> {
        self.checked_add_months(months)
            .ok_or(SortError::PeriodOutOfRange {
                period: *self,
                months,
            })
    }

    /// The following month.
    pub fn succ(&self) -> Result<Self> {
        self.add_months(1)
    }

    /// Render as a calendar date on `anchor_day`.
    ///
    /// `anchor_day` must lie in `1..=28` so that every month contains it.
    pub fn to_date(&self, anchor_day: u32) -> Result<NaiveDate> {
        if !(1..=28).contains(&anchor_day) {
            return Err(SortError::InvalidConfiguration(format!(
                "anchor day must be in 1..=28, got {anchor_day}"
            )));
        }
        NaiveDate::from_ymd_opt(self.year, self.month, anchor_day)
            .ok_or(SortError::InvalidPeriod(self.yyyymm()))
    }
}

impl From<Period> for i32 {
    fn from(period: Period) -> Self {
        period.yyyymm()
    }
}

impl TryFrom<i32> for Period {
    type Error = SortError;

    fn try_from(yyyymm: i32) -> Result<Self> {
        Self::from_yyyymm(yyyymm)
    }
}
