//! Threshold Policy and Gate Evaluation
//!
//! A metric passes iff its percentage is at least the configured minimum.
//! The gate passes iff every metric with a threshold passes.

use super::{CoverageSummary, Metric};
use crate::result::{CovgateError, CovgateResult};
use serde::{Deserialize, Serialize};

/// Minimum required percentage per metric; `None` means no requirement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdPolicy {
    /// Minimum line coverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<f64>,
    /// Minimum statement coverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<f64>,
    /// Minimum function coverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<f64>,
    /// Minimum branch coverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<f64>,
}

impl ThresholdPolicy {
    /// Policy without requirements
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the threshold of one metric, validating the range
    pub fn with(mut self, metric: Metric, minimum: f64) -> CovgateResult<Self> {
        validate_threshold(metric, minimum)?;
        *self.slot(metric) = Some(minimum);
        Ok(self)
    }

    /// Threshold of one metric
    #[must_use]
    pub const fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Functions => self.functions,
            Metric::Lines => self.lines,
        }
    }

    fn slot(&mut self, metric: Metric) -> &mut Option<f64> {
        match metric {
            Metric::Statements => &mut self.statements,
            Metric::Branches => &mut self.branches,
            Metric::Functions => &mut self.functions,
            Metric::Lines => &mut self.lines,
        }
    }

    /// Whether any threshold is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }

    /// Reject thresholds outside `0..=100`
    pub fn validate(&self) -> CovgateResult<()> {
        for metric in Metric::ALL {
            if let Some(minimum) = self.get(metric) {
                validate_threshold(metric, minimum)?;
            }
        }
        Ok(())
    }

    /// Thresholds from `other` replace the ones set here
    #[must_use]
    pub fn overridden_by(self, other: Self) -> Self {
        Self {
            lines: other.lines.or(self.lines),
            statements: other.statements.or(self.statements),
            functions: other.functions.or(self.functions),
            branches: other.branches.or(self.branches),
        }
    }
}

fn validate_threshold(metric: Metric, minimum: f64) -> CovgateResult<()> {
    if (0.0..=100.0).contains(&minimum) {
        Ok(())
    } else {
        Err(CovgateError::config(format!(
            "{metric} threshold must be between 0 and 100, got {minimum}"
        )))
    }
}

/// Outcome of one metric with a threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricOutcome {
    /// Metric evaluated
    pub metric: Metric,
    /// Actual percentage
    pub pct: f64,
    /// Required percentage
    pub threshold: f64,
    /// `pct >= threshold`
    pub passed: bool,
}

/// Result of gating a summary against a policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateResult {
    /// All thresholds met
    pub passed: bool,
    /// One entry per metric with a threshold, in report order
    pub outcomes: Vec<MetricOutcome>,
}

impl GateResult {
    /// Outcome for a metric, if it had a threshold
    #[must_use]
    pub fn outcome(&self, metric: Metric) -> Option<&MetricOutcome> {
        self.outcomes.iter().find(|o| o.metric == metric)
    }

    /// Metrics that fell below their threshold
    pub fn failures(&self) -> impl Iterator<Item = &MetricOutcome> + '_ {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Evaluate a summary against a policy
#[must_use]
pub fn evaluate(summary: &CoverageSummary, policy: &ThresholdPolicy) -> GateResult {
    let outcomes: Vec<MetricOutcome> = Metric::ALL
        .into_iter()
        .filter_map(|metric| {
            let threshold = policy.get(metric)?;
            let pct = summary.metric(metric).pct;
            Some(MetricOutcome {
                metric,
                pct,
                threshold,
                passed: pct >= threshold,
            })
        })
        .collect();

    GateResult {
        passed: outcomes.iter().all(|o| o.passed),
        outcomes,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::{MetricCounts, MetricMap};
    use proptest::prelude::*;

    fn summary_with_lines(total: u64, covered: u64) -> CoverageSummary {
        CoverageSummary::from_counts(MetricMap {
            lines: MetricCounts::new(total, covered),
            ..MetricMap::default()
        })
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn test_with_validates_range() {
            assert!(ThresholdPolicy::none().with(Metric::Lines, 100.0).is_ok());
            assert!(ThresholdPolicy::none().with(Metric::Lines, 0.0).is_ok());
            assert!(ThresholdPolicy::none().with(Metric::Lines, 100.5).is_err());
            assert!(ThresholdPolicy::none().with(Metric::Lines, -1.0).is_err());
            assert!(ThresholdPolicy::none().with(Metric::Lines, f64::NAN).is_err());
        }

        #[test]
        fn test_validate_deserialized_policy() {
            let policy: ThresholdPolicy = serde_json::from_str(r#"{"branches": 120}"#).unwrap();
            let err = policy.validate().unwrap_err();
            assert!(err.to_string().contains("branches"));
        }

        #[test]
        fn test_unknown_metric_rejected() {
            assert!(serde_json::from_str::<ThresholdPolicy>(r#"{"paths": 50}"#).is_err());
        }

        #[test]
        fn test_is_empty() {
            assert!(ThresholdPolicy::none().is_empty());
            let policy = ThresholdPolicy::none().with(Metric::Functions, 50.0).unwrap();
            assert!(!policy.is_empty());
        }

        #[test]
        fn test_overridden_by() {
            let base = ThresholdPolicy {
                lines: Some(80.0),
                branches: Some(50.0),
                ..ThresholdPolicy::default()
            };
            let cli = ThresholdPolicy {
                lines: Some(90.0),
                ..ThresholdPolicy::default()
            };
            let merged = base.overridden_by(cli);
            assert_eq!(merged.lines, Some(90.0));
            assert_eq!(merged.branches, Some(50.0));
            assert_eq!(merged.functions, None);
        }
    }

    mod evaluate_tests {
        use super::*;

        #[test]
        fn test_below_threshold_fails() {
            let policy = ThresholdPolicy::none().with(Metric::Lines, 90.0).unwrap();
            let result = evaluate(&summary_with_lines(15, 13), &policy);
            assert!(!result.passed);
            let outcome = result.outcome(Metric::Lines).unwrap();
            assert_eq!(outcome.pct, 86.67);
            assert!(!outcome.passed);
            assert_eq!(result.failures().count(), 1);
        }

        #[test]
        fn test_equal_to_threshold_passes() {
            let policy = ThresholdPolicy::none().with(Metric::Lines, 80.0).unwrap();
            let result = evaluate(&summary_with_lines(10, 8), &policy);
            assert!(result.passed);
        }

        #[test]
        fn test_rounded_percentage_is_compared() {
            let policy = ThresholdPolicy::none().with(Metric::Lines, 86.67).unwrap();
            assert!(evaluate(&summary_with_lines(15, 13), &policy).passed);
        }

        #[test]
        fn test_no_thresholds_always_pass() {
            let result = evaluate(&summary_with_lines(10, 0), &ThresholdPolicy::none());
            assert!(result.passed);
            assert!(result.outcomes.is_empty());
        }

        #[test]
        fn test_unset_metrics_excluded() {
            let policy = ThresholdPolicy::none().with(Metric::Branches, 50.0).unwrap();
            // lines at 0% do not matter; branches are empty and count as 100%
            let result = evaluate(&summary_with_lines(10, 0), &policy);
            assert!(result.passed);
            assert!(result.outcome(Metric::Lines).is_none());
        }

        #[test]
        fn test_all_metrics_must_pass() {
            let summary = CoverageSummary::from_counts(MetricMap {
                lines: MetricCounts::new(10, 10),
                statements: MetricCounts::new(10, 10),
                functions: MetricCounts::new(10, 4),
                branches: MetricCounts::new(10, 10),
            });
            let policy = ThresholdPolicy {
                lines: Some(90.0),
                statements: Some(90.0),
                functions: Some(50.0),
                branches: Some(90.0),
            };
            let result = evaluate(&summary, &policy);
            assert!(!result.passed);
            let failed: Vec<_> = result.failures().map(|o| o.metric).collect();
            assert_eq!(failed, [Metric::Functions]);
        }
    }

    proptest! {
        /// Gate fails iff some thresholded metric is strictly below its minimum
        #[test]
        fn prop_gate_fails_iff_metric_below(
            total in 0u64..200,
            covered_frac in 0.0f64..=1.0,
            threshold in 0.0f64..=100.0,
        ) {
            let covered = ((total as f64) * covered_frac).floor() as u64;
            let summary = summary_with_lines(total, covered);
            let policy = ThresholdPolicy::none().with(Metric::Lines, threshold).unwrap();
            let result = evaluate(&summary, &policy);
            let below = summary.lines().pct < threshold;
            prop_assert_eq!(result.passed, !below);
        }

        /// A threshold equal to the actual percentage always passes
        #[test]
        fn prop_boundary_passes(total in 1u64..200, covered_frac in 0.0f64..=1.0) {
            let covered = ((total as f64) * covered_frac).floor() as u64;
            let summary = summary_with_lines(total, covered);
            let policy = ThresholdPolicy::none()
                .with(Metric::Lines, summary.lines().pct)
                .unwrap();
            prop_assert!(evaluate(&summary, &policy).passed);
        }
    }
}
