//! dk - devkit command line
//!
//! Uploads large files to S3-compatible storage with concurrent multipart
//! uploads, deletes objects and manages the devkit configuration.

mod commands;
mod exit_code;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{completions, config, rm, upload};
use crate::output::OutputConfig;

/// Environment variable holding a tracing filter directive
const LOG_ENV: &str = "DK_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "dk",
    version,
    about = "Upload large files to S3-compatible storage",
    propagate_version = true
)]
pub struct Cli {
    /// Output strict JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files using concurrent multipart uploads
    Upload(upload::UploadArgs),

    /// Delete an object by key
    Rm(rm::RmArgs),

    /// Show or change the configuration
    Config(config::ConfigArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.debug) {
        eprintln!("Failed to initialize logging: {e:#}");
    }

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    let code = match cli.command {
        Commands::Upload(args) => upload::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Config(args) => config::execute(args, output_config),
        Commands::Completions(args) => completions::execute(args),
    };

    std::process::exit(code.as_i32());
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("dk_core=debug,dk_s3=debug,devkit_cli=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}
