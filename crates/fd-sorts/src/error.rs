//! Error types for panel preparation and portfolio sorts.

use crate::Period;
use thiserror::Error;

/// Result type for sort operations.
pub type Result<T> = std::result::Result<T, SortError>;

/// Errors that can occur while preparing a panel or sorting it into portfolios.
#[derive(Debug, Error)]
pub enum SortError {
    /// Invalid sort configuration (e.g. fewer than two groups)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A period cannot be split into the requested number of groups
    #[error("Insufficient data in {period}: need {required} signal values, got {available}")]
    InsufficientData {
        /// Period that could not be split
        period: Period,
        /// Number of groups requested
        required: usize,
        /// Observations with a non-missing signal in that period
        available: usize,
    },

    /// Missing required column in input data
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Signal not present in the registry
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    /// Integer that is not a valid yyyymm period
    #[error("Invalid period: {0}")]
    InvalidPeriod(i32),

    /// Month arithmetic left the supported year range
    #[error("Period {period} shifted by {months} months is out of range")]
    PeriodOutOfRange {
        /// Starting period
        period: Period,
        /// Requested shift
        months: i32,
    },

    /// Malformed value in source data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file error
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}
