//! rm command - Delete an object from the configured bucket

use clap::Args;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Delete an object by key
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Full object key, as printed by `dk upload`
    pub key: String,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    key: String,
    deleted: bool,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    if args.key.trim().is_empty() {
        formatter.error("Object key cannot be empty");
        return ExitCode::UsageError;
    }

    let storage = match super::setup_storage(&formatter).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    match storage.delete_object(&args.key).await {
        Ok(deleted) => {
            if formatter.is_json() {
                formatter.json(&RmOutput {
                    key: args.key,
                    deleted,
                });
            } else {
                formatter.success(&format!("Removed '{}'", formatter.style_name(&args.key)));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to remove '{}': {e}", args.key));
            ExitCode::from_error(&e)
        }
    }
}
