//! Signal registry for discovery and sign adjustment.
//!
//! Every signal carries a documented sign: `+1` when high values are
//! hypothesized to predict high future returns and `-1` when the opposite
//! holds. The registry is the lookup used to sign-adjust downloaded signal
//! columns so that group N is always the hypothesized long leg.

use crate::{Result, SortError};
use derive_more::Display;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Signal category, following the data source of the characteristic.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalCategory {
    /// Balance sheet and income statement data
    Accounting,
    /// Price and return history
    Price,
    /// Volume, turnover and other trading data
    Trading,
    /// Analyst forecasts and recommendations
    Analyst,
    /// Corporate events
    Event,
    /// Anything else
    Other,
}

impl SignalCategory {
    /// Parse a category label, falling back to [`SignalCategory::Other`].
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "accounting" => Self::Accounting,
            "price" => Self::Price,
            "trading" => Self::Trading,
            "analyst" => Self::Analyst,
            "event" => Self::Event,
            _ => Self::Other,
        }
    }
}

/// Metadata for a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalInfo {
    /// Signal acronym, matching the column name in downloaded data
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Signal category
    pub category: SignalCategory,
    /// `+1` or `-1`
    pub sign: i8,
}

impl SignalInfo {
    /// Create signal metadata. Any positive `sign` maps to `+1`, any other to `-1`.
    pub fn new(name: &str, description: &str, category: SignalCategory, sign: i8) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category,
            sign: if sign > 0 { 1 } else { -1 },
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocRow {
    #[serde(alias = "Acronym")]
    acronym: String,
    #[serde(alias = "LongDescription", default)]
    description: String,
    #[serde(alias = "Sign")]
    sign: f64,
    #[serde(alias = "Cat.Data", default)]
    category: String,
}

/// Registry of known signals keyed by acronym.
#[derive(Debug, Default, Clone)]
pub struct SignalRegistry {
    signals: HashMap<String, SignalInfo>,
}

impl SignalRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            signals: HashMap::new(),
        }
    }

    /// Registry with commonly studied signals.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(SignalInfo::new(
            "BM",
            "Book equity to market equity",
            SignalCategory::Accounting,
            1,
        ));
        registry.register(SignalInfo::new(
            "AssetGrowth",
            "Annual growth in total assets",
            SignalCategory::Accounting,
            -1,
        ));
        registry.register(SignalInfo::new(
            "GP",
            "Gross profits to total assets",
            SignalCategory::Accounting,
            1,
        ));
        registry.register(SignalInfo::new(
            "Accruals",
            "Operating accruals scaled by average total assets",
            SignalCategory::Accounting,
            -1,
        ));
        registry.register(SignalInfo::new(
            "Mom12m",
            "Cumulative return over months t-12 to t-2",
            SignalCategory::Price,
            1,
        ));
        registry.register(SignalInfo::new(
            "STreversal",
            "Prior month return",
            SignalCategory::Price,
            -1,
        ));
        registry.register(SignalInfo::new(
            "Size",
            "Log market equity",
            SignalCategory::Price,
            -1,
        ));

        registry
    }

    /// Load a registry from a signal documentation CSV.
    ///
    /// Expects the columns `acronym`, `description`, `sign` and `category`
    /// (the data service's `Acronym`, `LongDescription`, `Sign` and
    /// `Cat.Data` headers are accepted as well). Other columns are ignored.
    pub fn from_doc_reader<R: Read>(reader: R) -> Result<Self> {
        let mut registry = Self::new();
        let mut rdr = csv::Reader::from_reader(reader);

        for row in rdr.deserialize() {
            let row: DocRow = row?;
            if row.sign == 0.0 || row.sign.is_nan() {
                return Err(SortError::Parse(format!(
                    "signal {} has no usable sign",
                    row.acronym
                )));
            }
            let sign = if row.sign > 0.0 { 1 } else { -1 };
            registry.register(SignalInfo::new(
                row.acronym.trim(),
                &row.description,
                SignalCategory::parse(&row.category),
                sign,
            ));
        }

        Ok(registry)
    }

    /// Load a registry from a signal documentation CSV file.
    pub fn from_doc_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_doc_reader(file)
    }

    /// Register a signal, replacing any entry with the same name.
    pub fn register(&mut self, info: SignalInfo) {
        self.signals.insert(info.name.clone(), info);
    }

    /// Get a signal by name.
    pub fn get(&self, name: &str) -> Option<&SignalInfo> {
        self.signals.get(name)
    }

    /// Sign of a registered signal.
    pub fn sign(&self, name: &str) -> Result<i8> {
        self.get(name)
            .map(|info| info.sign)
            .ok_or_else(|| SortError::UnknownSignal(name.to_string()))
    }

    /// Get signals by category.
    pub fn by_category(&self, category: SignalCategory) -> Vec<&SignalInfo> {
        self.signals
            .values()
            .filter(|info| info.category == category)
            .collect()
    }

    /// All signal metadata, sorted by name.
    pub fn all_info(&self) -> Vec<&SignalInfo> {
        let mut all: Vec<_> = self.signals.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Get all signal names.
    pub fn names(&self) -> Vec<&str> {
        self.signals.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = SignalRegistry::with_defaults();
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), registry.names().len());

        assert_eq!(registry.sign("BM").unwrap(), 1);
        assert_eq!(registry.sign("AssetGrowth").unwrap(), -1);
        assert_eq!(
            registry.get("Mom12m").unwrap().category,
            SignalCategory::Price
        );
    }

    #[test]
    fn test_unknown_signal() {
        let registry = SignalRegistry::with_defaults();
        assert!(registry.get("NotASignal").is_none());
        assert!(matches!(
            registry.sign("NotASignal"),
            Err(SortError::UnknownSignal(name)) if name == "NotASignal"
        ));
    }

    #[test]
    fn test_by_category() {
        let registry = SignalRegistry::with_defaults();
        let accounting = registry.by_category(SignalCategory::Accounting);
        assert!(accounting.iter().any(|info| info.name == "BM"));
        assert!(
            accounting
                .iter()
                .all(|info| info.category == SignalCategory::Accounting)
        );
    }

    #[test]
    fn test_all_info_sorted() {
        let registry = SignalRegistry::with_defaults();
        let names: Vec<_> = registry.all_info().iter().map(|i| i.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_from_doc_reader() {
        let doc = "\
Acronym,Authors,LongDescription,Sign,Cat.Data
BM,Rosenberg,Book to market,1,Accounting
IdioVol,Ali,Idiosyncratic volatility,-1,Price
Custom,Someone,Something,-1.0,Alternative
";
        let registry = SignalRegistry::from_doc_reader(doc.as_bytes()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.sign("IdioVol").unwrap(), -1);
        assert_eq!(registry.get("BM").unwrap().description, "Book to market");
        assert_eq!(
            registry.get("Custom").unwrap().category,
            SignalCategory::Other
        );
    }

    #[test]
    fn test_from_doc_reader_rejects_zero_sign() {
        let doc = "acronym,description,sign,category\nBad,No sign,0,Price\n";
        assert!(matches!(
            SignalRegistry::from_doc_reader(doc.as_bytes()),
            Err(SortError::Parse(_))
        ));
    }
}
