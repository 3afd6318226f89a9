//! Report emission
//!
//! Human-readable rendering goes through [`SummaryRenderer`]; structured
//! formats are written by [`ReportEmitter`], one scoped thread per format.

use crate::config::CovgateConfig;
use crate::coverage::{
    CoberturaFormatter, CoveragePayload, CoverageSummary, GateResult, JsonFormatter,
    JsonSummaryFormatter, LcovFormatter, ReportFormat,
};
use crate::result::{CovgateError, CovgateResult};
use console::style;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 60;

/// Renders a summary for humans
pub trait SummaryRenderer {
    /// Render one line per metric, marking metrics that have a threshold
    fn render(&self, summary: &CoverageSummary, gate: &GateResult) -> String;
}

/// Istanbul-style text summary
///
/// ```text
/// ======================= Coverage summary =======================
/// Statements   : 86.67% ( 13/15 ), 0 skipped
/// Branches     : 100.00% ( 0/0 ), 0 skipped
/// Functions    : 50.00% ( 1/2 ), 0 skipped
/// Lines        : 86.67% ( 13/15 ), 0 skipped  FAIL (threshold 90.00%)
/// ================================================================
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextSummaryRenderer {
    /// Color pass/fail instead of spelling it out
    pub use_color: bool,
}

impl TextSummaryRenderer {
    /// Create a renderer
    #[must_use]
    pub const fn new(use_color: bool) -> Self {
        Self { use_color }
    }
}

impl SummaryRenderer for TextSummaryRenderer {
    fn render(&self, summary: &CoverageSummary, gate: &GateResult) -> String {
        let title = " Coverage summary ";
        let side = RULE_WIDTH.saturating_sub(title.len()) / 2;
        let mut out = format!("{}{title}{}\n", "=".repeat(side), "=".repeat(side));

        for (metric, stats) in summary.iter() {
            let pct = format!("{:.2}%", stats.pct);
            let counts = format!(
                "( {}/{} ), {} skipped",
                stats.covered, stats.total, stats.skipped
            );
            let label = format!("{:<13}", metric.label());

            let line = match gate.outcome(metric) {
                None => format!("{label}: {pct} {counts}"),
                Some(outcome) if self.use_color => {
                    let pct = if outcome.passed {
                        style(pct).green().force_styling(true)
                    } else {
                        style(pct).red().bold().force_styling(true)
                    };
                    format!(
                        "{label}: {pct} {counts}  (threshold {:.2}%)",
                        outcome.threshold
                    )
                }
                Some(outcome) => {
                    let mark = if outcome.passed { "PASS" } else { "FAIL" };
                    format!(
                        "{label}: {pct} {counts}  {mark} (threshold {:.2}%)",
                        outcome.threshold
                    )
                }
            };
            out.push_str(&line);
            out.push('\n');
        }

        let _ = writeln!(out, "{}", "=".repeat(side * 2 + title.len()));
        out
    }
}

/// Structured report writer
#[derive(Debug, Clone)]
pub struct ReportEmitter {
    output_dir: PathBuf,
    formats: Vec<ReportFormat>,
}

/// Files written and per-format failures of one emission
#[derive(Debug, Default)]
pub struct EmitOutcome {
    /// Files written successfully
    pub written: Vec<PathBuf>,
    /// `ReportWrite` errors, one per failed format
    pub failures: Vec<CovgateError>,
}

impl EmitOutcome {
    /// Whether every format was written
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl ReportEmitter {
    /// Emitter writing `formats` into `output_dir`
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>, formats: Vec<ReportFormat>) -> Self {
        Self {
            output_dir: output_dir.into(),
            formats,
        }
    }

    /// Emitter for `<tmp>/coverage/` and the configured reporters
    #[must_use]
    pub fn from_config(config: &CovgateConfig) -> Self {
        Self::new(config.report_dir(), config.reporters.clone())
    }

    /// Target directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Configured formats
    #[must_use]
    pub fn formats(&self) -> &[ReportFormat] {
        &self.formats
    }

    /// Write every configured format.
    ///
    /// Formats are independent: a failure in one is logged and collected
    /// without affecting the others.
    pub fn emit(
        &self,
        payload: &CoveragePayload,
        summary: &CoverageSummary,
        gate: &GateResult,
    ) -> EmitOutcome {
        let mut outcome = EmitOutcome::default();
        if self.formats.is_empty() {
            return outcome;
        }

        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            for &format in &self.formats {
                let error = CovgateError::ReportWrite {
                    format: format.to_string(),
                    path: self.output_dir.join(format.file_name()),
                    source: std::io::Error::new(e.kind(), e.to_string()),
                };
                tracing::warn!(%error, "report not written");
                outcome.failures.push(error);
            }
            return outcome;
        }

        let results: Vec<CovgateResult<PathBuf>> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .formats
                .iter()
                .map(|&format| {
                    let handle =
                        scope.spawn(move || self.write_format(format, payload, summary, gate));
                    (format, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(format, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(CovgateError::ReportWrite {
                            format: format.to_string(),
                            path: self.output_dir.join(format.file_name()),
                            source: std::io::Error::other("report writer panicked"),
                        })
                    })
                })
                .collect()
        });

        for result in results {
            match result {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "coverage report written");
                    outcome.written.push(path);
                }
                Err(error) => {
                    tracing::warn!(%error, "report not written");
                    outcome.failures.push(error);
                }
            }
        }
        outcome
    }

    fn write_format(
        &self,
        format: ReportFormat,
        payload: &CoveragePayload,
        summary: &CoverageSummary,
        gate: &GateResult,
    ) -> CovgateResult<PathBuf> {
        let path = self.output_dir.join(format.file_name());
        let write_error = |source: std::io::Error| CovgateError::ReportWrite {
            format: format.to_string(),
            path: path.clone(),
            source,
        };

        let content = match format {
            ReportFormat::Lcov => Ok(LcovFormatter::new(payload).generate()),
            ReportFormat::Cobertura => CoberturaFormatter::new(payload)
                .with_version(crate::VERSION)
                .generate(),
            ReportFormat::Json => JsonFormatter::new(payload).generate(),
            ReportFormat::JsonSummary => JsonSummaryFormatter::new(payload).generate(),
            ReportFormat::TextSummary => Ok(TextSummaryRenderer::new(false).render(summary, gate)),
        }
        .map_err(|e| write_error(std::io::Error::other(e.to_string())))?;

        std::fs::write(&path, content).map_err(write_error)?;
        Ok(path)
    }
}
