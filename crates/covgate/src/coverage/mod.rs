//! Coverage Aggregation and Threshold Gating
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  COVERAGE ENGINE                                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  TestResult → Collector → Payload → Summarizer → Evaluator      │
//! │                              ↓                       ↓           │
//! │                         Formatters              GateResult       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records merge through an order-independent join, counts add up
//! associatively and percentages are derived once from the final counts.

mod collector;
pub mod formatters;
mod metric;
mod payload;
mod record;
mod summary;
mod threshold;

pub use collector::{CoverageCollector, TestResult};
pub use formatters::{
    CoberturaFormatter, JsonFormatter, JsonSummaryFormatter, LcovFormatter, ReportFormat,
};
pub use metric::{Metric, MetricCounts, MetricMap};
pub use payload::{extract_bundle_payload, CoveragePayload};
pub use record::{BranchHit, FileCoverageRecord, FileDetail, FunctionHit, LineHit, StatementHit};
pub use summary::{
    percent, summarize, total_counts, CoverageSummary, MetricSummary, Summarizer,
};
pub use threshold::{evaluate, GateResult, MetricOutcome, ThresholdPolicy};
