//! Status output

use console::{style, Color, Term};
use covgate::GateResult;

/// Status line reporter (stderr)
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    fn prefix(&self, symbol: &str, plain: &str, color: Color) -> String {
        if self.use_color {
            style(symbol).fg(color).bold().to_string()
        } else {
            plain.to_string()
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self
            .term
            .write_line(&format!("{} {message}", self.prefix("✓", "PASS", Color::Green)));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let _ = self
            .term
            .write_line(&format!("{} {message}", self.prefix("✗", "FAIL", Color::Red)));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self
            .term
            .write_line(&format!("{} {message}", self.prefix("⚠", "WARN", Color::Yellow)));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self
            .term
            .write_line(&format!("{} {message}", self.prefix("ℹ", "INFO", Color::Blue)));
    }

    /// Print the gate verdict
    pub fn gate(&self, gate: Option<&GateResult>) {
        match gate {
            None => self.warning("No coverage data; thresholds were not checked"),
            Some(gate) if gate.outcomes.is_empty() => {
                self.info("No coverage thresholds configured");
            }
            Some(gate) if gate.passed => self.success("Coverage thresholds met"),
            Some(gate) => {
                for failure in gate.failures() {
                    self.failure(&gate_failure_message(
                        failure.metric.label(),
                        failure.pct,
                        failure.threshold,
                    ));
                }
            }
        }
    }
}

/// `Lines coverage 86.67% is below the 90.00% threshold`
#[must_use]
pub fn gate_failure_message(label: &str, pct: f64, threshold: f64) -> String {
    format!("{label} coverage {pct:.2}% is below the {threshold:.2}% threshold")
}
