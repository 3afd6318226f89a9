//! Check command handler

use super::load_config;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::CheckArgs;
use covgate::{
    CommandContext, CoveragePayload, CovgateConfig, GatingController, HostPlugin,
    LifecycleEvent, Metric, TestResult, TextSummaryRenderer, ThresholdPolicy,
};

/// Execute the check command, returning the process exit code
pub fn execute_check(config: &CliConfig, args: &CheckArgs) -> CliResult<u8> {
    let reporter = ProgressReporter::new(config.use_color(), config.verbosity.is_quiet());
    let gate_config = build_gate_config(args)?;
    let result = load_test_result(args)?;

    let stdout = std::io::stdout();
    let mut controller = GatingController::new(gate_config, stdout.lock())?
        .with_renderer(TextSummaryRenderer::new(config.use_color()));

    let mut context = CommandContext::new(controller.config().command.clone());
    controller.handle(LifecycleEvent::CommandStarted(&context))?;
    controller.handle(LifecycleEvent::TestResultAvailable(result))?;
    controller.handle(LifecycleEvent::CommandFinishing(&mut context))?;

    for failure in controller.report_failures() {
        reporter.warning(&failure.to_string());
    }
    if config.verbosity.is_verbose() && !controller.config().reporters.is_empty() {
        reporter.info(&format!(
            "Reports written to {}",
            controller.config().report_dir().display()
        ));
    }
    reporter.gate(controller.gate_result());

    let code = context.exit_code.unwrap_or(0);
    u8::try_from(code).map_err(|_| CliError::invalid_argument(format!("exit code {code}")))
}

/// Configuration file values overridden by command-line flags
pub fn build_gate_config(args: &CheckArgs) -> CliResult<CovgateConfig> {
    let mut config = load_config(args.config.as_deref())?;

    config.thresholds = config.thresholds.overridden_by(threshold_overrides(args)?);
    if !args.reporters.is_empty() {
        config.reporters.clear();
        for format in &args.reporters {
            if !config.reporters.contains(format) {
                config.reporters.push(*format);
            }
        }
    }
    if let Some(tmp_dir) = &args.tmp_dir {
        config.tmp_dir.clone_from(tmp_dir);
    }

    config.validate()?;
    tracing::debug!(
        command = %config.command,
        reporters = config.reporters.len(),
        tmp_dir = %config.tmp_dir.display(),
        "gate configuration resolved"
    );
    Ok(config)
}

/// Thresholds given on the command line
pub fn threshold_overrides(args: &CheckArgs) -> CliResult<ThresholdPolicy> {
    let flags = [
        (Metric::Lines, args.lines),
        (Metric::Statements, args.statements),
        (Metric::Functions, args.functions),
        (Metric::Branches, args.branches),
    ];
    let mut policy = ThresholdPolicy::none();
    for (metric, minimum) in flags {
        if let Some(minimum) = minimum {
            policy = policy.with(metric, minimum)?;
        }
    }
    Ok(policy)
}

/// Read the payload or bundle named on the command line
pub fn load_test_result(args: &CheckArgs) -> CliResult<TestResult> {
    if let Some(path) = &args.coverage {
        let json = std::fs::read_to_string(path)?;
        return Ok(TestResult::with_coverage(CoveragePayload::from_json_str(
            &json,
        )?));
    }
    if let Some(path) = &args.bundle {
        return Ok(TestResult::with_bundle(std::fs::read_to_string(path)?));
    }
    Err(CliError::invalid_argument(
        "either --coverage or --bundle is required",
    ))
}
