//! config command - Show and edit the devkit configuration
//!
//! Settings are addressed with dotted names matching the TOML layout,
//! e.g. `storage.bucket` or `upload.part_size`.

use clap::{Args, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use dk_core::config::{MIN_PART_SIZE, validate_endpoint};
use dk_core::{Config, ConfigManager, RetryConfig, UploadConfig};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Every key accepted by `dk config set`
const SETTINGS: &[&str] = &[
    "api_key",
    "storage.bucket",
    "storage.region",
    "storage.access_key",
    "storage.secret_key",
    "storage.project_prefix",
    "storage.endpoint",
    "storage.force_path_style",
    "upload.part_size",
    "upload.concurrency",
    "upload.single_shot",
    "retry.max_attempts",
    "retry.initial_backoff_ms",
    "retry.max_backoff_ms",
];

/// Show or change the configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current configuration (secrets masked)
    Show,

    /// Change a single setting
    Set(SetArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Setting name, e.g. storage.bucket
    pub key: String,

    /// New value; an empty string clears optional settings
    pub value: String,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    path: String,
    api_key_set: bool,
    storage: StorageView,
    upload: UploadConfig,
    retry: RetryConfig,
}

#[derive(Debug, Serialize)]
struct StorageView {
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
    project_prefix: Option<String>,
    endpoint: Option<String>,
    force_path_style: bool,
}

#[derive(Debug, Serialize)]
struct SetOutput {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    path: String,
    created: bool,
}

/// Execute the config command
pub fn execute(args: ConfigArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ConfigManager::new() {
        Ok(m) => m,
        Err(e) => {
            formatter.error(&format!("Failed to locate config: {e}"));
            return ExitCode::GeneralError;
        }
    };

    match args.command {
        ConfigCommands::Show => execute_show(&manager, &formatter),
        ConfigCommands::Set(set_args) => execute_set(set_args, &manager, &formatter),
        ConfigCommands::Init(init_args) => execute_init(init_args, &manager, &formatter),
    }
}

fn execute_show(manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    let config = match manager.load() {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to load config: {e}"));
            return ExitCode::from_error(&e);
        }
    };
    let view = view_of(&config, manager);

    if formatter.is_json() {
        formatter.json(&view);
        return ExitCode::Success;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    if !formatter.colors_enabled() {
        table.force_no_tty();
    }
    table.set_header(vec!["Setting", "Value"]);
    for (key, value) in rows(&view) {
        table.add_row(vec![formatter.style_key(key), value]);
    }

    formatter.println(&format!("Config file: {}", view.path));
    formatter.println(&table.to_string());
    ExitCode::Success
}

fn execute_set(args: SetArgs, manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    let mut config = match manager.load() {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to load config: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if let Err(e) = apply_setting(&mut config, &args.key, &args.value) {
        formatter.error(&e);
        return ExitCode::UsageError;
    }

    if let Err(e) = manager.save(&config) {
        formatter.error(&format!("Failed to save config: {e}"));
        return ExitCode::from_error(&e);
    }

    let shown = if is_secret(&args.key) {
        mask(&args.value)
    } else {
        args.value.clone()
    };
    if formatter.is_json() {
        formatter.json(&SetOutput {
            key: args.key,
            value: shown,
        });
    } else {
        formatter.success(&format!("{} = {shown}", formatter.style_key(&args.key)));
    }
    ExitCode::Success
}

fn execute_init(args: InitArgs, manager: &ConfigManager, formatter: &Formatter) -> ExitCode {
    let path = manager.path().display().to_string();
    if manager.path().exists() && !args.force {
        formatter.error(&format!(
            "Config already exists at '{path}'. Use --force to overwrite."
        ));
        return ExitCode::UsageError;
    }

    if let Err(e) = manager.save(&Config::default()) {
        formatter.error(&format!("Failed to write config: {e}"));
        return ExitCode::from_error(&e);
    }

    if formatter.is_json() {
        formatter.json(&InitOutput {
            path,
            created: true,
        });
    } else {
        formatter.success(&format!("Wrote default config to {path}"));
    }
    ExitCode::Success
}

fn view_of(config: &Config, manager: &ConfigManager) -> ConfigView {
    let storage = &config.storage;
    let secret_key = if storage.credentials.secret_key.is_empty() {
        String::new()
    } else {
        storage.credentials.masked_secret()
    };
    ConfigView {
        path: manager.path().display().to_string(),
        api_key_set: !config.api_key.trim().is_empty(),
        storage: StorageView {
            bucket: storage.bucket.clone(),
            region: storage.region.clone(),
            access_key: storage.credentials.access_key.clone(),
            secret_key,
            project_prefix: storage.project_prefix.clone(),
            endpoint: storage.endpoint.clone(),
            force_path_style: storage.force_path_style,
        },
        upload: config.upload.clone(),
        retry: config.retry.clone(),
    }
}

fn rows(view: &ConfigView) -> Vec<(&'static str, String)> {
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    vec![
        (
            "api_key",
            (if view.api_key_set { "set" } else { "not set" }).to_string(),
        ),
        ("storage.bucket", view.storage.bucket.clone()),
        ("storage.region", view.storage.region.clone()),
        ("storage.access_key", view.storage.access_key.clone()),
        ("storage.secret_key", view.storage.secret_key.clone()),
        ("storage.project_prefix", optional(&view.storage.project_prefix)),
        ("storage.endpoint", optional(&view.storage.endpoint)),
        (
            "storage.force_path_style",
            view.storage.force_path_style.to_string(),
        ),
        (
            "upload.part_size",
            humansize::format_size(view.upload.part_size, humansize::BINARY),
        ),
        ("upload.concurrency", view.upload.concurrency.to_string()),
        ("upload.single_shot", view.upload.single_shot.to_string()),
        ("retry.max_attempts", view.retry.max_attempts.to_string()),
        (
            "retry.initial_backoff_ms",
            view.retry.initial_backoff_ms.to_string(),
        ),
        ("retry.max_backoff_ms", view.retry.max_backoff_ms.to_string()),
    ]
}

fn is_secret(key: &str) -> bool {
    matches!(key, "api_key" | "storage.secret_key")
}

fn mask(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        "****".to_string()
    }
}

/// Apply `key = value` to the configuration
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    let optional = |v: &str| {
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    };

    match key {
        "api_key" => config.api_key = value.to_string(),
        "storage.bucket" => config.storage.bucket = value.to_string(),
        "storage.region" => config.storage.region = value.to_string(),
        "storage.access_key" => config.storage.credentials.access_key = value.to_string(),
        "storage.secret_key" => config.storage.credentials.secret_key = value.to_string(),
        "storage.project_prefix" => config.storage.project_prefix = optional(value),
        "storage.endpoint" => {
            let endpoint = optional(value);
            if let Some(ep) = &endpoint {
                validate_endpoint(ep).map_err(|e| e.to_string())?;
            }
            config.storage.endpoint = endpoint;
        }
        "storage.force_path_style" => config.storage.force_path_style = parse(key, value)?,
        "upload.part_size" => {
            let part_size: u64 = parse(key, value)?;
            if part_size < MIN_PART_SIZE {
                return Err(format!(
                    "{key} must be at least {}",
                    humansize::format_size(MIN_PART_SIZE, humansize::BINARY)
                ));
            }
            config.upload.part_size = part_size;
        }
        "upload.concurrency" => {
            let concurrency: usize = parse(key, value)?;
            if concurrency == 0 {
                return Err(format!("{key} must be at least 1"));
            }
            config.upload.concurrency = concurrency;
        }
        "upload.single_shot" => config.upload.single_shot = parse(key, value)?,
        "retry.max_attempts" => config.retry.max_attempts = parse(key, value)?,
        "retry.initial_backoff_ms" => config.retry.initial_backoff_ms = parse(key, value)?,
        "retry.max_backoff_ms" => config.retry.max_backoff_ms = parse(key, value)?,
        _ => {
            return Err(format!(
                "Unknown setting '{key}'. Valid settings: {}",
                SETTINGS.join(", ")
            ));
        }
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid value '{value}' for {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_storage_settings() {
        let mut config = Config::default();
        apply_setting(&mut config, "storage.bucket", "media").unwrap();
        apply_setting(&mut config, "storage.project_prefix", "acme").unwrap();
        apply_setting(&mut config, "storage.endpoint", "http://localhost:9000").unwrap();
        apply_setting(&mut config, "storage.force_path_style", "true").unwrap();

        assert_eq!(config.storage.bucket, "media");
        assert_eq!(config.storage.project_prefix.as_deref(), Some("acme"));
        assert_eq!(
            config.storage.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(config.storage.force_path_style);
    }

    #[test]
    fn test_empty_value_clears_optional() {
        let mut config = Config::default();
        config.storage.project_prefix = Some("acme".to_string());
        apply_setting(&mut config, "storage.project_prefix", "").unwrap();
        assert!(config.storage.project_prefix.is_none());
    }

    #[test]
    fn test_apply_upload_settings() {
        let mut config = Config::default();
        apply_setting(&mut config, "upload.part_size", "8388608").unwrap();
        apply_setting(&mut config, "upload.concurrency", "8").unwrap();
        apply_setting(&mut config, "upload.single_shot", "false").unwrap();
        assert_eq!(config.upload.part_size, 8 * 1024 * 1024);
        assert_eq!(config.upload.concurrency, 8);
        assert!(!config.upload.single_shot);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply_setting(&mut config, "upload.part_size", "0").is_err());
        assert!(apply_setting(&mut config, "upload.concurrency", "many").is_err());
        assert!(apply_setting(&mut config, "storage.endpoint", "ftp://host").is_err());
        assert!(apply_setting(&mut config, "storage.colour", "blue").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_endpoint_must_be_an_http_url() {
        let mut config = Config::default();
        for endpoint in ["not a url", "localhost:9000", "http://"] {
            assert!(
                apply_setting(&mut config, "storage.endpoint", endpoint).is_err(),
                "{endpoint} should be rejected"
            );
        }
        assert!(config.storage.endpoint.is_none());

        apply_setting(&mut config, "storage.endpoint", "https://minio.local:9000").unwrap();
        assert_eq!(
            config.storage.endpoint.as_deref(),
            Some("https://minio.local:9000")
        );
    }

    #[test]
    fn test_part_size_below_service_minimum() {
        let mut config = Config::default();
        let err = apply_setting(&mut config, "upload.part_size", "1048576").unwrap_err();
        assert!(err.contains("at least 5 MiB"), "{err}");
        apply_setting(&mut config, "upload.part_size", &MIN_PART_SIZE.to_string()).unwrap();
        assert_eq!(config.upload.part_size, MIN_PART_SIZE);
    }

    #[test]
    fn test_view_masks_secret() {
        let mut config = Config::default();
        config.api_key = "key-123".to_string();
        config.storage.credentials.access_key = "AKIA".to_string();
        config.storage.credentials.secret_key = "secretsecret".to_string();

        let view = view_of(&config, &ConfigManager::with_path("/tmp/dk/config.toml"));
        assert!(view.api_key_set);
        assert_eq!(view.storage.secret_key, "secr****");
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secretsecret"));
        assert!(!json.contains("key-123"));
    }

    #[test]
    fn test_every_setting_has_a_row() {
        let view = view_of(&Config::default(), &ConfigManager::with_path("c.toml"));
        let keys: Vec<_> = rows(&view).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, SETTINGS);
    }
}
