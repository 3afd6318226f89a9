//! Coverage Report Formatters
//!
//! LCOV, Cobertura XML and JSON generators for CI integration.

mod cobertura;
mod json;
mod lcov;

pub use cobertura::CoberturaFormatter;
pub use json::{JsonFormatter, JsonSummaryFormatter};
pub use lcov::LcovFormatter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structured report formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// `lcov.info`
    Lcov,
    /// `cobertura-coverage.xml`
    Cobertura,
    /// `coverage-final.json`
    Json,
    /// `coverage-summary.json`
    JsonSummary,
    /// `coverage-summary.txt`
    TextSummary,
}

impl ReportFormat {
    /// Every known format
    pub const ALL: [Self; 5] = [
        Self::Lcov,
        Self::Cobertura,
        Self::Json,
        Self::JsonSummary,
        Self::TextSummary,
    ];

    /// Identifier used in configuration files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lcov => "lcov",
            Self::Cobertura => "cobertura",
            Self::Json => "json",
            Self::JsonSummary => "json-summary",
            Self::TextSummary => "text-summary",
        }
    }

    /// File written inside the report directory
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Lcov => "lcov.info",
            Self::Cobertura => "cobertura-coverage.xml",
            Self::Json => "coverage-final.json",
            Self::JsonSummary => "coverage-summary.json",
            Self::TextSummary => "coverage-summary.txt",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|f| f.as_str()).collect();
                format!(
                    "unknown report format `{}` (expected one of: {})",
                    s.trim(),
                    known.join(", ")
                )
            })
    }
}
