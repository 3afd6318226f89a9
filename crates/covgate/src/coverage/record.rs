//! Per-file coverage records
//!
//! A [`FileCoverageRecord`] is produced once per instrumented file. It holds
//! the per-metric unit counts used by the summarizer and, when the runtime
//! supplied them, the individual unit hit counts used by the structured
//! report formats.

use super::{MetricCounts, MetricMap};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Hit count of one statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatementHit {
    /// Line the statement starts on
    pub line: u32,
    /// Number of executions
    pub hits: u64,
    /// Excluded from accounting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

/// Hit count of one function
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionHit {
    /// Function name (`(anonymous_N)` for unnamed functions)
    pub name: String,
    /// Declaration line
    pub line: u32,
    /// Number of calls
    pub hits: u64,
    /// Excluded from accounting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

/// Hit count of one branch arm
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchHit {
    /// Line of the branching construct
    pub line: u32,
    /// Index of the branching construct within the file
    pub block: u32,
    /// Index of the arm within the construct
    pub arm: u32,
    /// Number of times the arm was taken
    pub hits: u64,
    /// Excluded from accounting
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

/// Derived per-line hit count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHit {
    /// Highest hit count among the statements starting on the line
    pub hits: u64,
    /// Every statement on the line is skipped
    pub skipped: bool,
}

/// Individual unit hit counts of a file
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(default)]
pub struct FileDetail {
    /// Statements in source order
    pub statements: Vec<StatementHit>,
    /// Functions in source order
    pub functions: Vec<FunctionHit>,
    /// Branch arms in source order
    pub branches: Vec<BranchHit>,
}

impl FileDetail {
    /// No unit data at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.functions.is_empty() && self.branches.is_empty()
    }

    /// Line hits derived from statement start lines
    #[must_use]
    pub fn line_hits(&self) -> BTreeMap<u32, LineHit> {
        let mut lines: BTreeMap<u32, LineHit> = BTreeMap::new();
        for statement in &self.statements {
            let entry = lines.entry(statement.line).or_insert(LineHit {
                hits: 0,
                skipped: true,
            });
            entry.hits = entry.hits.max(statement.hits);
            entry.skipped &= statement.skipped;
        }
        lines
    }

    /// Unit counts per metric
    #[must_use]
    pub fn counts(&self) -> MetricMap<MetricCounts> {
        let lines = self.line_hits();
        MetricMap {
            lines: count_units(lines.values().map(|l| (l.hits, l.skipped))),
            statements: count_units(self.statements.iter().map(|s| (s.hits, s.skipped))),
            functions: count_units(self.functions.iter().map(|f| (f.hits, f.skipped))),
            branches: count_units(self.branches.iter().map(|b| (b.hits, b.skipped))),
        }
    }
}

/// Skipped units never count as covered.
fn count_units(units: impl Iterator<Item = (u64, bool)>) -> MetricCounts {
    units.fold(MetricCounts::default(), |mut acc, (hits, skipped)| {
        acc.total += 1;
        if skipped {
            acc.skipped += 1;
        } else if hits > 0 {
            acc.covered += 1;
        }
        acc
    })
}

/// Coverage of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCoverageRecord {
    path: String,
    counts: MetricMap<MetricCounts>,
    #[serde(default, skip_serializing_if = "FileDetail::is_empty")]
    detail: FileDetail,
}

impl FileCoverageRecord {
    /// Record from already-counted units
    #[must_use]
    pub fn from_counts(path: impl Into<String>, counts: MetricMap<MetricCounts>) -> Self {
        Self {
            path: path.into(),
            counts,
            detail: FileDetail::default(),
        }
    }

    /// Record from individual unit hit counts
    #[must_use]
    pub fn from_detail(path: impl Into<String>, detail: FileDetail) -> Self {
        Self {
            path: path.into(),
            counts: detail.counts(),
            detail,
        }
    }

    /// Absolute path of the source file
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Per-metric unit counts
    #[must_use]
    pub const fn counts(&self) -> &MetricMap<MetricCounts> {
        &self.counts
    }

    /// Unit detail (empty for pre-counted records)
    #[must_use]
    pub const fn detail(&self) -> &FileDetail {
        &self.detail
    }

    /// Combine two reports of the same file.
    ///
    /// Keeps the record with more covered units; ties fall back to a total
    /// order over the record contents. The result is always one of the
    /// inputs, so the operation is commutative, associative and idempotent.
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        match self.preference(&other) {
            Ordering::Less => other,
            Ordering::Equal | Ordering::Greater => self,
        }
    }

    fn preference(&self, other: &Self) -> Ordering {
        self.counts
            .covered_units()
            .cmp(&other.counts.covered_units())
            .then_with(|| self.counts.cmp(&other.counts))
            .then_with(|| self.detail.cmp(&other.detail))
            .then_with(|| self.path.cmp(&other.path))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn stmt(line: u32, hits: u64) -> StatementHit {
        StatementHit {
            line,
            hits,
            skipped: false,
        }
    }

    fn sample_detail() -> FileDetail {
        FileDetail {
            statements: vec![stmt(1, 3), stmt(1, 0), stmt(2, 0), stmt(4, 1)],
            functions: vec![
                FunctionHit {
                    name: "render".to_string(),
                    line: 1,
                    hits: 3,
                    skipped: false,
                },
                FunctionHit {
                    name: "unused".to_string(),
                    line: 2,
                    hits: 0,
                    skipped: false,
                },
            ],
            branches: vec![
                BranchHit {
                    line: 4,
                    block: 0,
                    arm: 0,
                    hits: 1,
                    skipped: false,
                },
                BranchHit {
                    line: 4,
                    block: 0,
                    arm: 1,
                    hits: 0,
                    skipped: true,
                },
            ],
        }
    }

    #[test]
    fn test_line_hits_take_max_of_statements() {
        let lines = sample_detail().line_hits();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[&1].hits, 3);
        assert_eq!(lines[&2].hits, 0);
        assert!(!lines[&1].skipped);
    }

    #[test]
    fn test_line_skipped_only_when_all_statements_skipped() {
        let detail = FileDetail {
            statements: vec![
                StatementHit {
                    line: 7,
                    hits: 0,
                    skipped: true,
                },
                stmt(7, 0),
                StatementHit {
                    line: 9,
                    hits: 0,
                    skipped: true,
                },
            ],
            ..FileDetail::default()
        };
        let lines = detail.line_hits();
        assert!(!lines[&7].skipped);
        assert!(lines[&9].skipped);
    }

    #[test]
    fn test_detail_counts() {
        let counts = sample_detail().counts();
        assert_eq!(counts.statements, MetricCounts::new(4, 2));
        assert_eq!(counts.lines, MetricCounts::new(3, 2));
        assert_eq!(counts.functions, MetricCounts::new(2, 1));
        assert_eq!(counts.branches, MetricCounts::new(2, 1).with_skipped(1));
        assert!(counts.is_consistent());
    }

    #[test]
    fn test_skipped_unit_with_hits_is_not_covered() {
        let detail = FileDetail {
            statements: vec![StatementHit {
                line: 1,
                hits: 5,
                skipped: true,
            }],
            ..FileDetail::default()
        };
        assert_eq!(
            detail.counts().statements,
            MetricCounts::new(1, 0).with_skipped(1)
        );
    }

    #[test]
    fn test_from_detail_derives_counts() {
        let record = FileCoverageRecord::from_detail("/src/a.js", sample_detail());
        assert_eq!(record.path(), "/src/a.js");
        assert_eq!(record.counts(), &sample_detail().counts());
        assert!(!record.detail().is_empty());
    }

    #[test]
    fn test_join_is_idempotent() {
        let record = FileCoverageRecord::from_detail("/src/a.js", sample_detail());
        assert_eq!(record.clone().join(record.clone()), record);
    }

    #[test]
    fn test_join_prefers_more_coverage_regardless_of_order() {
        let low = FileCoverageRecord::from_counts(
            "/src/a.js",
            MetricMap {
                lines: MetricCounts::new(10, 2),
                ..MetricMap::default()
            },
        );
        let high = FileCoverageRecord::from_counts(
            "/src/a.js",
            MetricMap {
                lines: MetricCounts::new(10, 7),
                ..MetricMap::default()
            },
        );
        assert_eq!(low.clone().join(high.clone()), high);
        assert_eq!(high.clone().join(low), high);
    }

    #[test]
    fn test_serialized_record_omits_empty_detail() {
        let record = FileCoverageRecord::from_counts("/src/a.js", MetricMap::default());
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("detail"));
        let back: FileCoverageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
