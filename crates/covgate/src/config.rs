//! Plugin configuration
//!
//! Loaded from YAML or built programmatically:
//!
//! ```yaml
//! command: test
//! extensions: [".js", ".jsx"]
//! reporters: [lcov, json-summary]
//! tmp_dir: tmp
//! thresholds:
//!   lines: 90
//!   branches: 80
//! ```

use crate::coverage::{Metric, ReportFormat, ThresholdPolicy};
use crate::result::{CovgateError, CovgateResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the report directory inside the tmp dir
pub const REPORT_DIR_NAME: &str = "coverage";

/// Coverage plugin configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CovgateConfig {
    /// Host command that runs with coverage
    pub command: String,
    /// Recognized source-file extensions
    pub extensions: Vec<String>,
    /// Marker between stem and extension of test files
    pub test_marker: String,
    /// Name of the code-transform step to partition
    pub code_transform: String,
    /// Instrumentation plugin appended to the source chain
    pub instrument_plugin: String,
    /// Base directory for temporary output
    pub tmp_dir: PathBuf,
    /// Structured report formats to write
    pub reporters: Vec<ReportFormat>,
    /// Per-metric minimum percentages
    pub thresholds: ThresholdPolicy,
}

impl Default for CovgateConfig {
    fn default() -> Self {
        Self {
            command: "test".to_string(),
            extensions: vec![".js".to_string(), ".jsx".to_string()],
            test_marker: "test".to_string(),
            code_transform: "babel".to_string(),
            instrument_plugin: "istanbul".to_string(),
            tmp_dir: PathBuf::from("tmp"),
            reporters: Vec::new(),
            thresholds: ThresholdPolicy::none(),
        }
    }
}

impl CovgateConfig {
    /// Create a builder starting from the defaults
    #[must_use]
    pub fn builder() -> CovgateConfigBuilder {
        CovgateConfigBuilder::default()
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> CovgateResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| CovgateError::config(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_file(path: &Path) -> CovgateResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading configuration");
        Self::from_yaml_str(&yaml)
    }

    /// Check every field that can make the run fail later
    pub fn validate(&self) -> CovgateResult<()> {
        if self.command.trim().is_empty() {
            return Err(CovgateError::config("command must not be empty"));
        }
        if self.code_transform.trim().is_empty() {
            return Err(CovgateError::config("code_transform must not be empty"));
        }
        if self.instrument_plugin.trim().is_empty() {
            return Err(CovgateError::config("instrument_plugin must not be empty"));
        }
        if !self
            .extensions
            .iter()
            .any(|ext| !ext.trim().trim_start_matches('.').is_empty())
        {
            return Err(CovgateError::config(
                "at least one source-file extension is required",
            ));
        }
        if self.test_marker.trim().trim_matches('.').is_empty() {
            return Err(CovgateError::config("test_marker must not be empty"));
        }
        self.thresholds.validate()
    }

    /// Directory structured reports are written to
    #[must_use]
    pub fn report_dir(&self) -> PathBuf {
        self.tmp_dir.join(REPORT_DIR_NAME)
    }
}

/// Builder for [`CovgateConfig`]
#[derive(Debug, Default)]
pub struct CovgateConfigBuilder {
    config: CovgateConfig,
    error: Option<CovgateError>,
}

impl CovgateConfigBuilder {
    /// Set the coverage command
    #[must_use]
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.config.command = command.into();
        self
    }

    /// Replace the recognized extensions
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the test marker
    #[must_use]
    pub fn test_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.test_marker = marker.into();
        self
    }

    /// Set the code-transform step name
    #[must_use]
    pub fn code_transform(mut self, name: impl Into<String>) -> Self {
        self.config.code_transform = name.into();
        self
    }

    /// Set the instrumentation plugin name
    #[must_use]
    pub fn instrument_plugin(mut self, name: impl Into<String>) -> Self {
        self.config.instrument_plugin = name.into();
        self
    }

    /// Set the tmp directory
    #[must_use]
    pub fn tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tmp_dir = dir.into();
        self
    }

    /// Add a report format; duplicates are ignored
    #[must_use]
    pub fn reporter(mut self, format: ReportFormat) -> Self {
        if !self.config.reporters.contains(&format) {
            self.config.reporters.push(format);
        }
        self
    }

    /// Set one metric threshold
    #[must_use]
    pub fn threshold(mut self, metric: Metric, minimum: f64) -> Self {
        match self.config.thresholds.with(metric, minimum) {
            Ok(policy) => self.config.thresholds = policy,
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Replace the threshold policy
    #[must_use]
    pub fn thresholds(mut self, policy: ThresholdPolicy) -> Self {
        self.config.thresholds = policy;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    ///
    /// `Configuration` for the first invalid setting.
    pub fn build(self) -> CovgateResult<CovgateConfig> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = CovgateConfig::default();
            assert_eq!(config.command, "test");
            assert_eq!(config.extensions, [".js", ".jsx"]);
            assert_eq!(config.test_marker, "test");
            assert_eq!(config.code_transform, "babel");
            assert_eq!(config.instrument_plugin, "istanbul");
            assert_eq!(config.tmp_dir, PathBuf::from("tmp"));
            assert!(config.reporters.is_empty());
            assert!(config.thresholds.is_empty());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_report_dir() {
            let config = CovgateConfig::builder().tmp_dir("/work/tmp").build().unwrap();
            assert_eq!(config.report_dir(), PathBuf::from("/work/tmp/coverage"));
        }
    }

    mod yaml_tests {
        use super::*;

        #[test]
        fn test_parse_full_document() {
            let config = CovgateConfig::from_yaml_str(
                r"
command: ci
extensions: [js, mjs]
reporters: [lcov, json-summary]
tmp_dir: out
thresholds:
  lines: 90
  branches: 75.5
",
            )
            .unwrap();
            assert_eq!(config.command, "ci");
            assert_eq!(config.extensions, ["js", "mjs"]);
            assert_eq!(
                config.reporters,
                [ReportFormat::Lcov, ReportFormat::JsonSummary]
            );
            assert_eq!(config.thresholds.lines, Some(90.0));
            assert_eq!(config.thresholds.branches, Some(75.5));
            assert_eq!(config.thresholds.functions, None);
            assert_eq!(config.code_transform, "babel");
        }

        #[test]
        fn test_empty_document_is_default() {
            let config = CovgateConfig::from_yaml_str("{}").unwrap();
            assert_eq!(config, CovgateConfig::default());
        }

        #[test]
        fn test_unknown_reporter_rejected() {
            let err = CovgateConfig::from_yaml_str("reporters: [clover]").unwrap_err();
            assert!(matches!(err, CovgateError::Configuration { .. }));
        }

        #[test]
        fn test_malformed_yaml_is_configuration_error() {
            let err = CovgateConfig::from_yaml_str("thresholds: [lines: 90").unwrap_err();
            assert!(matches!(err, CovgateError::Configuration { .. }));
            assert!(err.to_string().contains("malformed configuration"));
        }

        #[test]
        fn test_unknown_field_rejected() {
            assert!(CovgateConfig::from_yaml_str("thresholdz: {}").is_err());
        }

        #[test]
        fn test_out_of_range_threshold_rejected() {
            let err = CovgateConfig::from_yaml_str("thresholds: {lines: 120}").unwrap_err();
            assert!(err.to_string().contains("lines"));
        }

        #[test]
        fn test_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("covgate.yaml");
            std::fs::write(&path, "reporters: [cobertura]\n").unwrap();
            let config = CovgateConfig::from_file(&path).unwrap();
            assert_eq!(config.reporters, [ReportFormat::Cobertura]);
        }

        #[test]
        fn test_from_missing_file_is_io_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = CovgateConfig::from_file(&dir.path().join("nope.yaml")).unwrap_err();
            assert!(matches!(err, CovgateError::Io(_)));
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_builder_sets_fields() {
            let config = CovgateConfig::builder()
                .command("ci")
                .extensions(["ts"])
                .test_marker("check")
                .code_transform("swc")
                .instrument_plugin("coverage")
                .reporter(ReportFormat::Lcov)
                .reporter(ReportFormat::Lcov)
                .threshold(Metric::Lines, 80.0)
                .build()
                .unwrap();
            assert_eq!(config.command, "ci");
            assert_eq!(config.extensions, ["ts"]);
            assert_eq!(config.test_marker, "check");
            assert_eq!(config.code_transform, "swc");
            assert_eq!(config.instrument_plugin, "coverage");
            assert_eq!(config.reporters, [ReportFormat::Lcov]);
            assert_eq!(config.thresholds.lines, Some(80.0));
        }

        #[test]
        fn test_builder_rejects_bad_threshold() {
            let err = CovgateConfig::builder()
                .threshold(Metric::Branches, -1.0)
                .build()
                .unwrap_err();
            assert!(matches!(err, CovgateError::Configuration { .. }));
        }

        #[test]
        fn test_builder_rejects_nan_threshold() {
            assert!(CovgateConfig::builder()
                .threshold(Metric::Lines, f64::NAN)
                .build()
                .is_err());
        }

        #[test]
        fn test_builder_rejects_empty_extensions() {
            let err = CovgateConfig::builder()
                .extensions(Vec::<String>::new())
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("extension"));
        }

        #[test]
        fn test_builder_rejects_empty_command() {
            assert!(CovgateConfig::builder().command("  ").build().is_err());
        }
    }
}
