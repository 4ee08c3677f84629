//! Subcommand implementations
//!
//! Each command exposes `execute(args, output_config) -> ExitCode` and
//! prints through the shared [`Formatter`](crate::output::Formatter).

pub mod completions;
pub mod config;
pub mod rm;
pub mod upload;

use std::sync::Arc;

use dk_core::{AuthGate as _, ConfigManager, DevKit, Storage};
use dk_s3::S3Transport;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Load the configuration, check the API key and connect to storage
pub(crate) async fn setup_storage(formatter: &Formatter) -> Result<Storage, ExitCode> {
    let manager = match ConfigManager::new() {
        Ok(m) => m,
        Err(e) => {
            formatter.error(&format!("Failed to locate config: {e}"));
            return Err(ExitCode::GeneralError);
        }
    };

    let config = match manager.load() {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!(
                "Failed to load config '{}': {e}",
                manager.path().display()
            ));
            return Err(ExitCode::from_error(&e));
        }
    };

    let storage_config = config.storage.clone();
    let retry_config = config.retry.clone();
    let kit = DevKit::from_config(config);
    if !kit.is_authorized() {
        formatter.error("No API key configured. Run 'dk config set api_key <KEY>' first.");
        return Err(ExitCode::AuthError);
    }

    let transport = match S3Transport::new(&storage_config, retry_config).await {
        Ok(t) => t,
        Err(e) => {
            formatter.error(&format!("Failed to create storage client: {e}"));
            return Err(ExitCode::from_error(&e));
        }
    };

    Ok(Storage::new(kit, Arc::new(transport)))
}
