//! Partition command handler

use super::load_config;
use crate::error::CliResult;
use crate::PartitionArgs;
use covgate::{CovgateConfig, Partitioner, PipelineDescription};

/// Execute the partition command
pub fn execute_partition(args: &PartitionArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let json = std::fs::read_to_string(&args.pipeline)?;
    println!("{}", partition_pipeline(&json, &config)?);
    Ok(())
}

/// Partition a pipeline description, returning the adjusted description as JSON
pub fn partition_pipeline(json: &str, config: &CovgateConfig) -> CliResult<String> {
    let mut pipeline = PipelineDescription::from_json_str(json)?;
    let partitioner = Partitioner::from_config(config)?;
    partitioner.partition(&pipeline)?.apply(&mut pipeline)?;
    Ok(serde_json::to_string_pretty(&pipeline)?)
}
