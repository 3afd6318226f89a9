//! Coverage Collector
//!
//! Receives the coverage produced by the instrumentation runtime once per
//! test run. The host hands over either a decoded payload or the text of the
//! instrumented bundle, which carries `__coverage__` assignments.

use super::{extract_bundle_payload, CoveragePayload};
use crate::result::{CovgateError, CovgateResult};

/// Test result delivered by the host
#[derive(Debug, Clone, Default)]
pub struct TestResult {
    /// Payload reported by the runtime
    pub coverage: Option<CoveragePayload>,
    /// Instrumented bundle text, used when no payload was reported
    pub bundle: Option<String>,
}

impl TestResult {
    /// Result carrying a decoded payload
    #[must_use]
    pub fn with_coverage(payload: CoveragePayload) -> Self {
        Self {
            coverage: Some(payload),
            bundle: None,
        }
    }

    /// Result carrying the instrumented bundle
    #[must_use]
    pub fn with_bundle(bundle: impl Into<String>) -> Self {
        Self {
            coverage: None,
            bundle: Some(bundle.into()),
        }
    }

    /// Result of a run that produced no coverage
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Pulls the coverage payload out of a test result
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageCollector;

impl CoverageCollector {
    /// Create a new collector
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Collect the payload of a test run.
    ///
    /// # Errors
    ///
    /// `MissingCoverage` when the result carries no payload, or one without
    /// files. `InvalidPayload` when the bundle holds undecodable coverage.
    pub fn collect(&self, result: TestResult) -> CovgateResult<CoveragePayload> {
        let payload = match (result.coverage, result.bundle) {
            (Some(payload), _) => payload,
            (None, Some(bundle)) => extract_bundle_payload(&bundle)?,
            (None, None) => {
                return Err(CovgateError::missing_coverage(
                    "the test run did not report a coverage payload",
                ))
            }
        };

        if payload.is_empty() {
            return Err(CovgateError::missing_coverage(
                "the coverage payload contains no files",
            ));
        }

        tracing::debug!(files = payload.len(), "collected coverage payload");
        Ok(payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::{FileCoverageRecord, MetricCounts, MetricMap};

    fn one_file_payload() -> CoveragePayload {
        std::iter::once(FileCoverageRecord::from_counts(
            "/app/a.js",
            MetricMap {
                lines: MetricCounts::new(3, 2),
                ..MetricMap::default()
            },
        ))
        .collect()
    }

    #[test]
    fn test_collect_payload() {
        let payload = CoverageCollector::new()
            .collect(TestResult::with_coverage(one_file_payload()))
            .unwrap();
        assert_eq!(payload.len(), 1);
    }

    #[test]
    fn test_payload_takes_precedence_over_bundle() {
        let result = TestResult {
            coverage: Some(one_file_payload()),
            bundle: Some("__coverage__='not json';\n".to_string()),
        };
        assert!(CoverageCollector::new().collect(result).is_ok());
    }

    #[test]
    fn test_collect_from_bundle() {
        let bundle = "__coverage__='{\"/app/b.js\":{\"lines\":{\"total\":1,\"covered\":1}}}';\n";
        let payload = CoverageCollector::new()
            .collect(TestResult::with_bundle(bundle))
            .unwrap();
        assert!(payload.get("/app/b.js").is_some());
    }

    #[test]
    fn test_missing_payload() {
        let err = CoverageCollector::new()
            .collect(TestResult::empty())
            .unwrap_err();
        assert!(matches!(err, CovgateError::MissingCoverage { .. }));
    }

    #[test]
    fn test_empty_payload_is_missing() {
        let err = CoverageCollector::new()
            .collect(TestResult::with_coverage(CoveragePayload::new()))
            .unwrap_err();
        assert!(matches!(err, CovgateError::MissingCoverage { .. }));
    }

    #[test]
    fn test_bundle_without_coverage_is_missing() {
        let err = CoverageCollector::new()
            .collect(TestResult::with_bundle("var a = 1;\n"))
            .unwrap_err();
        assert!(matches!(err, CovgateError::MissingCoverage { .. }));
    }
}
