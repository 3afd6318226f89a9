//! Covgate: Coverage Aggregation and Threshold Gating
//!
//! Instruments source files through the bundler pipeline, merges per-file
//! coverage into project statistics, writes structured reports and fails the
//! host command when coverage drops below the configured thresholds.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    COVGATE Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Pipeline   │    │ Coverage   │    │ Threshold  │            │
//! │   │ Partitioner│    │ Summarizer │───►│ Evaluator  │            │
//! │   └─────▲──────┘    └─────▲──────┘    └─────┬──────┘            │
//! │         │                 │                 ▼                   │
//! │   ┌─────┴─────────────────┴──────┐    ┌────────────┐            │
//! │   │      Gating Controller       │───►│  Report    │            │
//! │   │   (host lifecycle events)    │    │  Emitter   │            │
//! │   └──────────────────────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use covgate::{
//!     CommandContext, CoveragePayload, CovgateConfig, GatingController, HostPlugin,
//!     LifecycleEvent, Metric, TestResult,
//! };
//!
//! let config = CovgateConfig::builder()
//!     .threshold(Metric::Lines, 90.0)
//!     .build()?;
//! let mut controller = GatingController::new(config, std::io::sink())?;
//!
//! let payload = CoveragePayload::from_json_str(
//!     r#"{"/app/a.js": {"lines": {"total": 10, "covered": 8}}}"#,
//! )?;
//!
//! let mut context = CommandContext::new("test");
//! controller.handle(LifecycleEvent::CommandStarted(&context))?;
//! controller.handle(LifecycleEvent::TestResultAvailable(TestResult::with_coverage(payload)))?;
//! controller.handle(LifecycleEvent::CommandFinishing(&mut context))?;
//! assert_eq!(context.exit_code, Some(1));
//! # Ok::<(), covgate::CovgateError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

pub mod config;
pub mod controller;
pub mod coverage;
pub mod pipeline;
pub mod report;
mod result;

pub use config::{CovgateConfig, CovgateConfigBuilder, REPORT_DIR_NAME};
pub use controller::{
    CommandContext, GateState, GatingController, HostPlugin, LifecycleEvent,
    GATE_FAILURE_EXIT_CODE,
};
pub use coverage::{
    evaluate, extract_bundle_payload, summarize, CoverageCollector, CoveragePayload,
    CoverageSummary, FileCoverageRecord, GateResult, Metric, MetricCounts, MetricMap,
    MetricOutcome, MetricSummary, ReportFormat, Summarizer, TestResult, ThresholdPolicy,
};
pub use pipeline::{
    FileMatcher, PipelineDescription, PipelinePartition, Partitioner, TransformOptions,
    TransformStep,
};
pub use report::{EmitOutcome, ReportEmitter, SummaryRenderer, TextSummaryRenderer};
pub use result::{CovgateError, CovgateResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
