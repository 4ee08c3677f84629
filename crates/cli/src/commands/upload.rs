//! upload command - Upload local files to the configured bucket
//!
//! Files larger than one part go through a concurrent multipart upload.
//! Ctrl-C cancels the upload in flight and aborts its session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use dk_core::config::MIN_PART_SIZE;
use dk_core::{FileSource, PartSource as _, ProgressFn, UploadOptions, UploadResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Upload files to the configured bucket
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Files or glob patterns to upload
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,

    /// Folder placed between the project prefix and the generated file name
    #[arg(short, long)]
    pub folder: Option<String>,

    /// Part size, e.g. 8MiB or 16M (defaults to the configured value)
    #[arg(long, value_parser = parse_size)]
    pub part_size: Option<u64>,

    /// Number of parts uploaded at the same time
    #[arg(short = 'P', long)]
    pub concurrency: Option<usize>,

    /// Use a multipart session even when the file fits in one part
    #[arg(long)]
    pub multipart: bool,

    /// Content type sent with every file (guessed from the extension otherwise)
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    uploaded: Vec<UploadedFile>,
    count: usize,
    total_size: u64,
    total_size_human: String,
}

#[derive(Debug, Serialize)]
struct UploadedFile {
    file: String,
    #[serde(flatten)]
    result: UploadResult,
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let files = match expand_paths(&args.paths) {
        Ok(f) => f,
        Err(e) => {
            formatter.error(&e);
            return ExitCode::UsageError;
        }
    };

    let storage = match super::setup_storage(&formatter).await {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut options = UploadOptions::from(storage.defaults()).folder(args.folder.clone());
    if let Some(part_size) = args.part_size {
        options = options.part_size(part_size);
    }
    if let Some(concurrency) = args.concurrency {
        options = options.concurrency(concurrency);
    }
    if args.multipart {
        options = options.single_shot(false);
    }

    let cancel = CancellationToken::new();
    let signal_task = {
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, cancelling upload");
                token.cancel();
            }
        })
    };

    let mut uploaded = Vec::with_capacity(files.len());
    for path in &files {
        let mut source = match FileSource::open(path).await {
            Ok(s) => s,
            Err(e) => {
                formatter.error(&format!("Cannot read '{}': {e}", path.display()));
                signal_task.abort();
                return ExitCode::from_error(&e);
            }
        };
        if let Some(content_type) = &args.content_type {
            source = source.with_content_type(content_type.clone());
        }
        if let Err(e) = check_part_size(options.part_size, source.size()) {
            formatter.error(&format!("Cannot upload '{}': {e}", path.display()));
            signal_task.abort();
            return ExitCode::UsageError;
        }

        let progress = progress_bar(&formatter, path);
        let on_progress = progress.clone().map(|pb| {
            Arc::new(move |pct: u8| pb.set_position(u64::from(pct))) as ProgressFn
        });

        match storage
            .upload_with(&source, &options, on_progress, &cancel)
            .await
        {
            Ok(result) => {
                if let Some(pb) = &progress {
                    pb.finish_and_clear();
                }
                formatter.success(&format!(
                    "{} -> {} ({})",
                    formatter.style_name(&path.display().to_string()),
                    formatter.style_url(&result.location),
                    formatter.style_size(&format_size(source.size()))
                ));
                uploaded.push(UploadedFile {
                    file: path.display().to_string(),
                    result,
                });
            }
            Err(e) => {
                if let Some(pb) = &progress {
                    pb.abandon();
                }
                formatter.error(&format!("Failed to upload '{}': {e}", path.display()));
                let failed = e.failed_parts();
                if !failed.is_empty() {
                    formatter.warning(&format!("Failed parts: {failed:?}"));
                }
                signal_task.abort();
                return ExitCode::from_error(&e);
            }
        }
    }
    signal_task.abort();

    if formatter.is_json() {
        let total_size = uploaded.iter().map(|u| u.result.size).sum();
        formatter.json(&UploadOutput {
            count: uploaded.len(),
            total_size,
            total_size_human: format_size(total_size),
            uploaded,
        });
    }

    ExitCode::Success
}

fn progress_bar(formatter: &Formatter, path: &Path) -> Option<ProgressBar> {
    if !formatter.progress_enabled() {
        return None;
    }
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos:>3}%")
            .expect("Valid template")
            .progress_chars("#>-"),
    );
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    pb.set_message(name);
    Some(pb)
}

fn format_size(size: u64) -> String {
    humansize::format_size(size, humansize::BINARY)
}

/// Expand glob patterns; plain paths are passed through unchanged
fn expand_paths(patterns: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            files.push(PathBuf::from(pattern));
            continue;
        }

        let entries =
            glob::glob(pattern).map_err(|e| format!("Invalid pattern '{pattern}': {e}"))?;
        let before = files.len();
        for entry in entries {
            let path = entry.map_err(|e| format!("Cannot read '{pattern}': {e}"))?;
            if path.is_file() {
                files.push(path);
            }
        }
        if files.len() == before {
            return Err(format!("No files match '{pattern}'"));
        }
    }
    Ok(files)
}

/// Every part but the last must meet the service minimum, so a file that
/// splits into several parts needs `part_size >= MIN_PART_SIZE`
fn check_part_size(part_size: u64, file_size: u64) -> Result<(), String> {
    if file_size > part_size && part_size < MIN_PART_SIZE {
        return Err(format!(
            "part size {} is below the {} minimum for multipart uploads",
            format_size(part_size),
            format_size(MIN_PART_SIZE)
        ));
    }
    Ok(())
}

/// Parse a byte size such as `5242880`, `8M`, `16MiB` or `1g` (binary units)
fn parse_size(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let number: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{value}'"))?;
    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => return Err(format!("unknown size unit '{other}'")),
    };

    number
        .checked_mul(multiplier)
        .filter(|size| *size > 0)
        .ok_or_else(|| format!("size '{value}' is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("5242880").unwrap(), 5 * 1024 * 1024);
        assert_eq!(parse_size("8M").unwrap(), 8 * 1024 * 1024);
        assert_eq!(parse_size("16MiB").unwrap(), 16 * 1024 * 1024);
        assert_eq!(parse_size("1g").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("64 KB").unwrap(), 64 * 1024);
    }

    #[test]
    fn test_small_parts_only_for_single_part_files() {
        let mib = 1024 * 1024;
        assert!(check_part_size(mib, 3 * mib).is_err());
        assert!(check_part_size(mib, mib).is_ok());
        assert!(check_part_size(mib, 10).is_ok());
        assert!(check_part_size(MIN_PART_SIZE, 12 * mib).is_ok());
        assert!(check_part_size(MIN_PART_SIZE - 1, MIN_PART_SIZE).is_err());
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("0").is_err());
        assert!(parse_size("MiB").is_err());
        assert!(parse_size("5TB").is_err());
    }

    #[test]
    fn test_expand_plain_paths_untouched() {
        let paths = expand_paths(&["missing.bin".to_string()]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("missing.bin")]);
    }

    #[test]
    fn test_expand_glob_only_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();
        std::fs::create_dir(dir.path().join("dir.mp4")).unwrap();

        let pattern = format!("{}/*.mp4", dir.path().display());
        let mut paths = expand_paths(&[pattern]).unwrap();
        paths.sort();
        assert_eq!(
            paths,
            vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")]
        );
    }

    #[test]
    fn test_expand_glob_without_matches() {
        let dir = TempDir::new().unwrap();
        let pattern = format!("{}/*.mov", dir.path().display());
        let err = expand_paths(&[pattern]).unwrap_err();
        assert!(err.contains("No files match"));
    }
}
