//! JSON Report Formatters
//!
//! `coverage-final.json` holds every record with its unit detail;
//! `coverage-summary.json` holds the project `total` and a `files` map with
//! one summary per path.

use crate::coverage::{summarize, CoveragePayload, CoverageSummary};
use crate::result::CovgateResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Full per-file detail as JSON
#[derive(Debug)]
pub struct JsonFormatter<'a> {
    payload: &'a CoveragePayload,
}

impl<'a> JsonFormatter<'a> {
    /// Create a new JSON formatter
    #[must_use]
    pub fn new(payload: &'a CoveragePayload) -> Self {
        Self { payload }
    }

    /// Generate the pretty-printed document
    pub fn generate(&self) -> CovgateResult<String> {
        Ok(serde_json::to_string_pretty(self.payload)?)
    }
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    total: CoverageSummary,
    files: BTreeMap<&'a str, CoverageSummary>,
}

/// Project and per-file summaries as JSON
#[derive(Debug)]
pub struct JsonSummaryFormatter<'a> {
    payload: &'a CoveragePayload,
}

impl<'a> JsonSummaryFormatter<'a> {
    /// Create a new JSON summary formatter
    #[must_use]
    pub fn new(payload: &'a CoveragePayload) -> Self {
        Self { payload }
    }

    /// Generate the pretty-printed document
    pub fn generate(&self) -> CovgateResult<String> {
        let document = SummaryDocument {
            total: summarize(self.payload)?,
            files: self
                .payload
                .records()
                .map(|record| {
                    (
                        record.path(),
                        CoverageSummary::from_counts(*record.counts()),
                    )
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}
