//! Extract command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::ProgressReporter;
use crate::ExtractArgs;
use covgate::extract_bundle_payload;

/// Execute the extract command
pub fn execute_extract(config: &CliConfig, args: &ExtractArgs) -> CliResult<()> {
    let reporter = ProgressReporter::new(config.use_color(), config.verbosity.is_quiet());
    let bundle = std::fs::read_to_string(&args.bundle)?;
    let (json, files) = extract_payload_json(&bundle)?;

    if files == 0 {
        reporter.warning(&format!(
            "No coverage found in {}",
            args.bundle.display()
        ));
    }

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            reporter.success(&format!(
                "Extracted coverage for {files} file(s) to {}",
                path.display()
            ));
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Payload JSON and file count of a bundle
pub fn extract_payload_json(bundle: &str) -> CliResult<(String, usize)> {
    let payload = extract_bundle_payload(bundle)?;
    Ok((serde_json::to_string_pretty(&payload)?, payload.len()))
}
