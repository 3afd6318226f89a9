//! Gating Controller
//!
//! Drives partitioning, collection, summarizing, evaluation and reporting
//! from the host's lifecycle events.
//!
//! ```text
//!   Idle ──command-started──► Configuring ──pipeline-config──► AwaitingResult
//!    │ (other command)            │                                │
//!    ▼                            └──────────test-result───────────┤
//!  Skipped                                                         ▼
//!                                         Done ◄────────────── Evaluating
//! ```
//!
//! `command-finishing` sets the exit code to 1 at most once, and only when a
//! gate result was computed and failed.

use crate::config::CovgateConfig;
use crate::coverage::{
    evaluate, CoverageCollector, CoverageSummary, GateResult, Summarizer, TestResult,
};
use crate::pipeline::{Partitioner, PipelineDescription};
use crate::report::{ReportEmitter, SummaryRenderer, TextSummaryRenderer};
use crate::result::{CovgateError, CovgateResult};
use std::fmt;
use std::io::Write;

/// Exit code reported when the gate fails
pub const GATE_FAILURE_EXIT_CODE: i32 = 1;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for the command to start
    Idle,
    /// Coverage command started; pipeline not partitioned yet
    Configuring,
    /// Pipeline partitioned; waiting for the test result
    AwaitingResult,
    /// Processing the test result
    Evaluating,
    /// Finished; a gate result may be cached
    Done,
    /// Command is not the coverage command; every event is a no-op
    Skipped,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::AwaitingResult => "awaiting-result",
            Self::Evaluating => "evaluating",
            Self::Done => "done",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Host command context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Command being run (`test`, `build`, ...)
    pub command: String,
    /// Exit code override requested by plugins
    pub exit_code: Option<i32>,
}

impl CommandContext {
    /// Context for `command` without an exit code override
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exit_code: None,
        }
    }
}

/// Host lifecycle events
#[derive(Debug)]
pub enum LifecycleEvent<'a> {
    /// The host command started
    CommandStarted(&'a CommandContext),
    /// The bundler pipeline may be adjusted
    PipelineConfigRequested(&'a mut PipelineDescription),
    /// The test run finished
    TestResultAvailable(TestResult),
    /// The host command is about to exit
    CommandFinishing(&'a mut CommandContext),
}

impl LifecycleEvent<'_> {
    /// Event name as used by the host
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CommandStarted(_) => "command-started",
            Self::PipelineConfigRequested(_) => "pipeline-config-requested",
            Self::TestResultAvailable(_) => "test-result-available",
            Self::CommandFinishing(_) => "command-finishing",
        }
    }
}

/// A plugin driven by the host's lifecycle
pub trait HostPlugin {
    /// The host command started
    fn on_command_started(&mut self, context: &CommandContext) -> CovgateResult<()>;

    /// The bundler pipeline may be adjusted
    fn on_pipeline_config(&mut self, pipeline: &mut PipelineDescription) -> CovgateResult<()>;

    /// The test run finished
    fn on_test_result(&mut self, result: TestResult) -> CovgateResult<()>;

    /// The host command is about to exit
    fn on_command_finishing(&mut self, context: &mut CommandContext) -> CovgateResult<()>;

    /// Dispatch one event
    ///
    /// # Errors
    ///
    /// Fatal errors must abort the host command.
    fn handle(&mut self, event: LifecycleEvent<'_>) -> CovgateResult<()> {
        match event {
            LifecycleEvent::CommandStarted(context) => self.on_command_started(context),
            LifecycleEvent::PipelineConfigRequested(pipeline) => {
                self.on_pipeline_config(pipeline)
            }
            LifecycleEvent::TestResultAvailable(result) => self.on_test_result(result),
            LifecycleEvent::CommandFinishing(context) => self.on_command_finishing(context),
        }
    }
}

/// Coverage gate driven by lifecycle events.
///
/// Human-readable output is written to `out`.
pub struct GatingController<W: Write> {
    config: CovgateConfig,
    partitioner: Partitioner,
    collector: CoverageCollector,
    emitter: ReportEmitter,
    renderer: Box<dyn SummaryRenderer>,
    out: W,
    state: GateState,
    summary: Option<CoverageSummary>,
    gate: Option<GateResult>,
    report_failures: Vec<CovgateError>,
    exit_code_set: bool,
}

impl<W: Write> fmt::Debug for GatingController<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatingController")
            .field("command", &self.config.command)
            .field("state", &self.state)
            .field("gate", &self.gate)
            .field("exit_code_set", &self.exit_code_set)
            .finish_non_exhaustive()
    }
}

impl<W: Write> GatingController<W> {
    /// Create a controller for a validated configuration
    ///
    /// # Errors
    ///
    /// `Configuration` when `config` is invalid.
    pub fn new(config: CovgateConfig, out: W) -> CovgateResult<Self> {
        config.validate()?;
        Ok(Self {
            partitioner: Partitioner::from_config(&config)?,
            collector: CoverageCollector::new(),
            emitter: ReportEmitter::from_config(&config),
            renderer: Box::new(TextSummaryRenderer::default()),
            config,
            out,
            state: GateState::Idle,
            summary: None,
            gate: None,
            report_failures: Vec::new(),
            exit_code_set: false,
        })
    }

    /// Replace the summary renderer
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl SummaryRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &CovgateConfig {
        &self.config
    }

    /// Summary of the evaluated run
    #[must_use]
    pub const fn summary(&self) -> Option<&CoverageSummary> {
        self.summary.as_ref()
    }

    /// Cached gate result
    #[must_use]
    pub const fn gate_result(&self) -> Option<&GateResult> {
        self.gate.as_ref()
    }

    /// Report formats that could not be written
    #[must_use]
    pub fn report_failures(&self) -> &[CovgateError] {
        &self.report_failures
    }

    /// Consume the controller, returning the output sink
    pub fn into_output(self) -> W {
        self.out
    }

    fn ignore(&self, event: &str) {
        tracing::debug!(state = %self.state, event, "event ignored in current state");
    }

    fn transition(&mut self, next: GateState) {
        tracing::debug!(from = %self.state, to = %next, "gate state transition");
        self.state = next;
    }

    fn evaluate_result(&mut self, result: TestResult) -> CovgateResult<()> {
        let payload = match self.collector.collect(result) {
            Ok(payload) => payload,
            Err(e @ CovgateError::MissingCoverage { .. }) => {
                tracing::warn!(error = %e, "coverage gate skipped");
                writeln!(self.out, "WARN {e}; coverage thresholds not checked")?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut summarizer = Summarizer::new();
        summarizer.merge_payload(&payload);
        let summary = summarizer.finish()?;
        let gate = evaluate(&summary, &self.config.thresholds);

        tracing::info!(
            files = summarizer.file_count(),
            lines = summary.lines().pct,
            statements = summary.statements().pct,
            functions = summary.functions().pct,
            branches = summary.branches().pct,
            passed = gate.passed,
            "coverage evaluated"
        );

        self.out
            .write_all(self.renderer.render(&summary, &gate).as_bytes())?;

        let emitted = self.emitter.emit(&payload, &summary, &gate);
        for failure in &emitted.failures {
            writeln!(self.out, "WARN {failure}")?;
        }
        self.report_failures = emitted.failures;
        self.summary = Some(summary);
        self.gate = Some(gate);
        Ok(())
    }
}

impl<W: Write> HostPlugin for GatingController<W> {
    fn on_command_started(&mut self, context: &CommandContext) -> CovgateResult<()> {
        if self.state != GateState::Idle {
            self.ignore("command-started");
            return Ok(());
        }
        if context.command == self.config.command {
            self.transition(GateState::Configuring);
        } else {
            tracing::debug!(
                command = %context.command,
                coverage_command = %self.config.command,
                "not the coverage command"
            );
            self.transition(GateState::Skipped);
        }
        Ok(())
    }

    fn on_pipeline_config(&mut self, pipeline: &mut PipelineDescription) -> CovgateResult<()> {
        if self.state != GateState::Configuring {
            self.ignore("pipeline-config-requested");
            return Ok(());
        }
        let applied = self
            .partitioner
            .partition(pipeline)
            .and_then(|partition| partition.apply(pipeline));
        match applied {
            Ok(()) => {
                self.transition(GateState::AwaitingResult);
                Ok(())
            }
            Err(e) => {
                self.transition(GateState::Done);
                Err(e)
            }
        }
    }

    fn on_test_result(&mut self, result: TestResult) -> CovgateResult<()> {
        if !matches!(
            self.state,
            GateState::Configuring | GateState::AwaitingResult
        ) {
            self.ignore("test-result-available");
            return Ok(());
        }
        self.transition(GateState::Evaluating);
        let evaluated = self.evaluate_result(result);
        self.transition(GateState::Done);
        evaluated
    }

    fn on_command_finishing(&mut self, context: &mut CommandContext) -> CovgateResult<()> {
        if self.state != GateState::Done {
            self.ignore("command-finishing");
            return Ok(());
        }
        if self.exit_code_set {
            return Ok(());
        }
        if let Some(gate) = self.gate.as_ref().filter(|gate| !gate.passed) {
            for failure in gate.failures() {
                tracing::info!(
                    metric = %failure.metric,
                    pct = failure.pct,
                    threshold = failure.threshold,
                    "coverage below threshold"
                );
            }
            context.exit_code = Some(GATE_FAILURE_EXIT_CODE);
            self.exit_code_set = true;
        }
        Ok(())
    }
}
