//! Coverage metrics and per-metric unit counts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four independently tracked coverage metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Statement coverage
    Statements,
    /// Branch-arm coverage
    Branches,
    /// Function coverage
    Functions,
    /// Line coverage
    Lines,
}

impl Metric {
    /// All metrics in report order
    pub const ALL: [Self; 4] = [
        Self::Statements,
        Self::Branches,
        Self::Functions,
        Self::Lines,
    ];

    /// Identifier used in configuration files
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Statements => "statements",
            Self::Branches => "branches",
            Self::Functions => "functions",
            Self::Lines => "lines",
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Statements => "Statements",
            Self::Branches => "Branches",
            Self::Functions => "Functions",
            Self::Lines => "Lines",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statements" => Ok(Self::Statements),
            "branches" => Ok(Self::Branches),
            "functions" => Ok(Self::Functions),
            "lines" => Ok(Self::Lines),
            other => Err(format!("unknown coverage metric `{other}`")),
        }
    }
}

/// Unit counts for a single metric
///
/// `covered` and `skipped` are disjoint subsets of `total`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct MetricCounts {
    /// Number of units
    pub total: u64,
    /// Units with a hit count above zero
    pub covered: u64,
    /// Units explicitly excluded from accounting
    #[serde(default)]
    pub skipped: u64,
}

impl MetricCounts {
    /// Counts with nothing skipped
    #[must_use]
    pub const fn new(total: u64, covered: u64) -> Self {
        Self {
            total,
            covered,
            skipped: 0,
        }
    }

    /// Set the skipped count
    #[must_use]
    pub const fn with_skipped(mut self, skipped: u64) -> Self {
        self.skipped = skipped;
        self
    }

    /// Check `covered + skipped <= total`
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        match self.covered.checked_add(self.skipped) {
            Some(sum) => sum <= self.total,
            None => false,
        }
    }

    /// Field-wise sum, `None` if any field overflows
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        let (Some(total), Some(covered), Some(skipped)) = (
            self.total.checked_add(rhs.total),
            self.covered.checked_add(rhs.covered),
            self.skipped.checked_add(rhs.skipped),
        ) else {
            return None;
        };
        Some(Self {
            total,
            covered,
            skipped,
        })
    }
}

/// One value per coverage metric
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(
    default,
    deny_unknown_fields,
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct MetricMap<T> {
    /// Line value
    pub lines: T,
    /// Statement value
    pub statements: T,
    /// Function value
    pub functions: T,
    /// Branch value
    pub branches: T,
}

impl<T> MetricMap<T> {
    /// Build a map by evaluating `f` for every metric
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            statements: f(Metric::Statements),
            branches: f(Metric::Branches),
            functions: f(Metric::Functions),
            lines: f(Metric::Lines),
        }
    }

    /// Value for a metric
    #[must_use]
    pub const fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Statements => &self.statements,
            Metric::Branches => &self.branches,
            Metric::Functions => &self.functions,
            Metric::Lines => &self.lines,
        }
    }

    /// Mutable value for a metric
    pub fn get_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Statements => &mut self.statements,
            Metric::Branches => &mut self.branches,
            Metric::Functions => &mut self.functions,
            Metric::Lines => &mut self.lines,
        }
    }

    /// Transform every value
    pub fn map<U>(&self, mut f: impl FnMut(Metric, &T) -> U) -> MetricMap<U> {
        MetricMap::from_fn(|metric| f(metric, self.get(metric)))
    }

    /// Iterate in report order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &T)> + '_ {
        Metric::ALL.into_iter().map(move |metric| (metric, self.get(metric)))
    }
}

impl MetricMap<MetricCounts> {
    /// Per-metric sum, `None` if any count overflows
    #[must_use]
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        Some(Self {
            lines: self.lines.checked_add(rhs.lines)?,
            statements: self.statements.checked_add(rhs.statements)?,
            functions: self.functions.checked_add(rhs.functions)?,
            branches: self.branches.checked_add(rhs.branches)?,
        })
    }

    /// Sum of covered units across all metrics
    #[must_use]
    pub fn covered_units(&self) -> u128 {
        self.iter().map(|(_, counts)| u128::from(counts.covered)).sum()
    }

    /// Whether every metric satisfies `covered + skipped <= total`
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.iter().all(|(_, counts)| counts.is_consistent())
    }
}
