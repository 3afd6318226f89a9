//! Coverage Summary
//!
//! Folds per-file records into project-wide counts. Counts are combined by
//! checked addition, which is associative and commutative, so records may be
//! merged in any order or reduced in parallel. A sum that does not fit in
//! `u64` is rejected as an invalid payload. Percentages are computed once at
//! the end from the final counts.

use super::{CoveragePayload, FileCoverageRecord, Metric, MetricCounts, MetricMap};
use crate::result::{CovgateError, CovgateResult};
use serde::{Deserialize, Serialize};

/// Summary statistics for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Number of units
    pub total: u64,
    /// Units with a hit count above zero
    pub covered: u64,
    /// Units excluded from accounting
    pub skipped: u64,
    /// `covered / total * 100`, rounded to two decimals; 100 when empty
    pub pct: f64,
}

impl MetricSummary {
    /// Summarize final counts
    #[must_use]
    pub fn from_counts(counts: MetricCounts) -> Self {
        Self {
            total: counts.total,
            covered: counts.covered,
            skipped: counts.skipped,
            pct: percent(counts.covered, counts.total),
        }
    }
}

impl Default for MetricSummary {
    fn default() -> Self {
        Self::from_counts(MetricCounts::default())
    }
}

/// Percentage rounded half-up to two decimals
#[must_use]
pub fn percent(covered: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0; // Vacuously true
    }
    let raw = (covered as f64 * 10_000.0 / total as f64).round() / 100.0;
    raw.clamp(0.0, 100.0)
}

/// Project-wide coverage summary
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageSummary {
    metrics: MetricMap<MetricSummary>,
}

impl CoverageSummary {
    /// Summarize aggregated counts
    #[must_use]
    pub fn from_counts(counts: MetricMap<MetricCounts>) -> Self {
        Self {
            metrics: counts.map(|_, c| MetricSummary::from_counts(*c)),
        }
    }

    /// Summary for one metric
    #[must_use]
    pub const fn metric(&self, metric: Metric) -> &MetricSummary {
        self.metrics.get(metric)
    }

    /// Line summary
    #[must_use]
    pub const fn lines(&self) -> &MetricSummary {
        &self.metrics.lines
    }

    /// Statement summary
    #[must_use]
    pub const fn statements(&self) -> &MetricSummary {
        &self.metrics.statements
    }

    /// Function summary
    #[must_use]
    pub const fn functions(&self) -> &MetricSummary {
        &self.metrics.functions
    }

    /// Branch summary
    #[must_use]
    pub const fn branches(&self) -> &MetricSummary {
        &self.metrics.branches
    }

    /// Metrics in report order
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricSummary)> + '_ {
        self.metrics.iter()
    }
}

/// Accumulates records for one build run
///
/// Records are keyed by path: re-merging a record that is already present
/// changes nothing, so incremental rebuilds that report the same files again
/// do not inflate the totals.
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    records: CoveragePayload,
}

impl Summarizer {
    /// Empty summarizer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one record
    pub fn merge(&mut self, record: FileCoverageRecord) {
        self.records.insert(record);
    }

    /// Merge every record of a payload
    pub fn merge_payload(&mut self, payload: &CoveragePayload) {
        for record in payload.records() {
            self.merge(record.clone());
        }
    }

    /// Number of distinct files merged
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.records.len()
    }

    /// Summarize everything merged so far
    pub fn finish(&self) -> CovgateResult<CoverageSummary> {
        summarize(&self.records)
    }
}

/// Add up the counts of several records
///
/// # Errors
///
/// `InvalidPayload` naming the first record whose counts overflow the sum.
pub fn total_counts<'a>(
    records: impl IntoIterator<Item = &'a FileCoverageRecord>,
) -> CovgateResult<MetricMap<MetricCounts>> {
    records
        .into_iter()
        .try_fold(MetricMap::default(), |acc, record| {
            acc.checked_add(record.counts()).ok_or_else(|| {
                CovgateError::invalid_payload(format!(
                    "{}: coverage counts overflow the project total",
                    record.path()
                ))
            })
        })
}

/// Summarize a payload
pub fn summarize(payload: &CoveragePayload) -> CovgateResult<CoverageSummary> {
    Ok(CoverageSummary::from_counts(total_counts(payload.records())?))
}
