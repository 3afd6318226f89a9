//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains the execution logic for a CLI command and
//! the pure helpers it is built from.

pub mod check;
pub mod extract;
pub mod partition;

pub use check::{build_gate_config, execute_check, load_test_result, threshold_overrides};
pub use extract::{execute_extract, extract_payload_json};
pub use partition::{execute_partition, partition_pipeline};

use crate::error::CliResult;
use covgate::CovgateConfig;
use std::path::Path;

/// Load the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> CliResult<CovgateConfig> {
    match path {
        Some(path) => Ok(CovgateConfig::from_file(path)?),
        None => Ok(CovgateConfig::default()),
    }
}
