#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sorts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod observation;
pub mod panel;
pub mod period;
pub mod registry;
pub mod sort;
pub mod source;
pub mod study;

// Re-export core types
pub use config::SortConfig;
pub use error::{Result, SortError};
pub use observation::{
    DATE_COLUMN, ENTITY_COLUMN, Observation, PERIOD_COLUMN, RETURN_COLUMN, SIGNAL_COLUMN,
    observations_to_frame,
};
pub use panel::{align_returns, lag_signals, merge_panel, sign_adjust};
pub use period::{DEFAULT_ANCHOR_DAY, MAX_YEAR, MIN_YEAR, Period};
pub use registry::{SignalCategory, SignalInfo, SignalRegistry};
pub use sort::{GroupSummary, PortfolioSort, SpreadSummary, summarize};
pub use source::{CsvReturnSource, CsvSignalSource, ReturnSource, SignalSource};
pub use study::{SignalReport, SignalStudy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
