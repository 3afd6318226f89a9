//! Pipeline Partitioning
//!
//! Splits the bundler's code-transform step in two: test files keep the
//! original transform, source files get the same transform with the
//! instrumentation plugin appended.
//!
//! ```text
//!   babel (*.js, *.jsx)
//!        │
//!        ├── test chain:   babel                 (*.test.js, *.test.jsx)
//!        └── source chain: babel + istanbul      (*.js, *.jsx minus tests)
//! ```
//!
//! Derivation is pure; [`PipelinePartition::apply`] is the only place the
//! caller's pipeline description is mutated.

use crate::config::CovgateConfig;
use crate::result::{CovgateError, CovgateResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MatcherPatterns {
    include: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exclude: Option<String>,
}

/// Path predicate: matches `include` and not `exclude`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MatcherPatterns", into = "MatcherPatterns")]
pub struct FileMatcher {
    include: Regex,
    exclude: Option<Regex>,
}

impl FileMatcher {
    /// Compile a matcher
    pub fn new(include: &str, exclude: Option<&str>) -> CovgateResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| {
                CovgateError::config(format!("invalid file pattern `{pattern}`: {e}"))
            })
        };
        Ok(Self {
            include: compile(include)?,
            exclude: exclude.map(compile).transpose()?,
        })
    }

    /// Whether `path` is routed to this matcher
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }

    /// Include pattern source
    #[must_use]
    pub fn include_pattern(&self) -> &str {
        self.include.as_str()
    }

    /// Exclude pattern source
    #[must_use]
    pub fn exclude_pattern(&self) -> Option<&str> {
        self.exclude.as_ref().map(Regex::as_str)
    }
}

impl PartialEq for FileMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.include_pattern() == other.include_pattern()
            && self.exclude_pattern() == other.exclude_pattern()
    }
}

impl TryFrom<MatcherPatterns> for FileMatcher {
    type Error = CovgateError;

    fn try_from(patterns: MatcherPatterns) -> CovgateResult<Self> {
        Self::new(&patterns.include, patterns.exclude.as_deref())
    }
}

impl From<FileMatcher> for MatcherPatterns {
    fn from(matcher: FileMatcher) -> Self {
        Self {
            include: matcher.include.as_str().to_string(),
            exclude: matcher.exclude.map(|re| re.as_str().to_string()),
        }
    }
}

/// Options of a transform step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Ordered plugin list
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Any other transform-specific options, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One step of the bundler's transform pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStep {
    /// Transform name (`babel`, `json`, ...)
    pub name: String,
    /// Files the step applies to
    pub matcher: FileMatcher,
    /// Transform options
    #[serde(default)]
    pub options: TransformOptions,
}

/// Ordered transform steps of the bundler
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineDescription {
    /// Steps in application order
    pub steps: Vec<TransformStep>,
}

impl PipelineDescription {
    /// Decode a pipeline description from JSON
    pub fn from_json_str(json: &str) -> CovgateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Source and test chains derived from one code-transform step
#[derive(Debug, Clone, PartialEq)]
pub struct PipelinePartition {
    step_index: usize,
    source_chain: TransformStep,
    test_chain: TransformStep,
}

impl PipelinePartition {
    /// Chain applied to non-test source files
    #[must_use]
    pub const fn source_chain(&self) -> &TransformStep {
        &self.source_chain
    }

    /// Chain applied to test files
    #[must_use]
    pub const fn test_chain(&self) -> &TransformStep {
        &self.test_chain
    }

    /// Narrow the original step to test files and append the source chain.
    ///
    /// # Errors
    ///
    /// `Configuration` when `pipeline` no longer has the step the partition
    /// was derived from.
    pub fn apply(self, pipeline: &mut PipelineDescription) -> CovgateResult<()> {
        let step = pipeline
            .steps
            .get_mut(self.step_index)
            .filter(|step| step.name == self.test_chain.name)
            .ok_or_else(|| {
                CovgateError::config(format!(
                    "pipeline changed: step {} is no longer `{}`",
                    self.step_index, self.test_chain.name
                ))
            })?;
        *step = self.test_chain;
        pipeline.steps.push(self.source_chain);
        Ok(())
    }
}

/// Routes files to the test or source chain
#[derive(Debug, Clone)]
pub struct Partitioner {
    code_transform: String,
    instrument_plugin: String,
    test_matcher: FileMatcher,
    source_matcher: FileMatcher,
}

impl Partitioner {
    /// Create a partitioner.
    ///
    /// `extensions` may be given with or without the leading dot.
    pub fn new(
        extensions: &[String],
        test_marker: &str,
        code_transform: impl Into<String>,
        instrument_plugin: impl Into<String>,
    ) -> CovgateResult<Self> {
        let alternatives: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Err(CovgateError::config(
                "at least one source-file extension is required",
            ));
        }
        let marker = test_marker.trim().trim_matches('.');
        if marker.is_empty() {
            return Err(CovgateError::config("the test marker must not be empty"));
        }

        let ext_group = format!("(?:{})", alternatives.join("|"));
        let test_pattern = format!(r"\.{}\.{ext_group}$", regex::escape(marker));
        let source_pattern = format!(r"\.{ext_group}$");

        Ok(Self {
            code_transform: code_transform.into(),
            instrument_plugin: instrument_plugin.into(),
            test_matcher: FileMatcher::new(&test_pattern, None)?,
            source_matcher: FileMatcher::new(&source_pattern, Some(&test_pattern))?,
        })
    }

    /// Partitioner for a validated configuration
    pub fn from_config(config: &CovgateConfig) -> CovgateResult<Self> {
        Self::new(
            &config.extensions,
            &config.test_marker,
            config.code_transform.clone(),
            config.instrument_plugin.clone(),
        )
    }

    /// Matcher of the test chain
    #[must_use]
    pub const fn test_matcher(&self) -> &FileMatcher {
        &self.test_matcher
    }

    /// Matcher of the source chain
    #[must_use]
    pub const fn source_matcher(&self) -> &FileMatcher {
        &self.source_matcher
    }

    /// Whether `path` is a test file
    #[must_use]
    pub fn is_test_file(&self, path: &str) -> bool {
        self.test_matcher.matches(path)
    }

    /// Whether `path` is an instrumented source file
    #[must_use]
    pub fn is_source_file(&self, path: &str) -> bool {
        self.source_matcher.matches(path)
    }

    /// Derive the two chains from the pipeline's code-transform step.
    ///
    /// # Errors
    ///
    /// `Configuration` when no step is named after the code transform.
    pub fn partition(&self, pipeline: &PipelineDescription) -> CovgateResult<PipelinePartition> {
        let (step_index, base) = pipeline
            .steps
            .iter()
            .enumerate()
            .find(|(_, step)| step.name == self.code_transform)
            .ok_or_else(|| {
                CovgateError::config(format!(
                    "no `{}` step found in the transform pipeline",
                    self.code_transform
                ))
            })?;

        let test_chain = TransformStep {
            matcher: self.test_matcher.clone(),
            ..base.clone()
        };

        let mut source_chain = TransformStep {
            matcher: self.source_matcher.clone(),
            ..base.clone()
        };
        if !source_chain
            .options
            .plugins
            .iter()
            .any(|plugin| plugin == &self.instrument_plugin)
        {
            source_chain
                .options
                .plugins
                .push(self.instrument_plugin.clone());
        }

        tracing::debug!(
            step = step_index,
            transform = %self.code_transform,
            plugin = %self.instrument_plugin,
            "partitioned transform pipeline"
        );

        Ok(PipelinePartition {
            step_index,
            source_chain,
            test_chain,
        })
    }
}
