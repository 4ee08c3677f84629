//! Error types for devkit
//!
//! One error enum covers the whole upload pipeline. Part-level failures are
//! collected by the coordinator and surfaced inside
//! [`Error::MultipartUploadFailed`], never raised on their own.

use thiserror::Error;

use crate::multipart::{PartAck, PartFailure};

/// Result alias used throughout devkit
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by devkit operations
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller input: zero part size, missing file, empty key
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The auth gate refused the call before any network traffic
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The transport refused to open a multipart session
    #[error("Failed to open upload session: {0}")]
    SessionOpenFailed(String),

    /// A single part failed or came back without an integrity tag
    #[error("Part {part_number} failed: {cause}")]
    PartUploadFailed { part_number: u32, cause: String },

    /// One or more parts failed and the session was aborted (or an abort was attempted)
    #[error("{}", describe_multipart_failure(.failures, .partial_acks, .abort_error))]
    MultipartUploadFailed {
        /// Acknowledgements of the parts that did succeed, ascending
        partial_acks: Vec<PartAck>,
        /// Failed parts in the order they were observed
        failures: Vec<PartFailure>,
        /// Error from the best-effort abort, if it failed too
        abort_error: Option<String>,
    },

    /// Every part succeeded but the completion request was rejected
    #[error("Failed to commit upload: {0}")]
    CommitFailed(String),

    /// The caller cancelled the upload; the session was aborted
    #[error("Upload cancelled{}", cancel_suffix(.aborted))]
    Cancelled { aborted: bool },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    General(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Toml(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Toml(e.to_string())
    }
}

impl Error {
    /// Failed parts carried by this error, if any
    pub fn failed_parts(&self) -> Vec<u32> {
        match self {
            Error::PartUploadFailed { part_number, .. } => vec![*part_number],
            Error::MultipartUploadFailed { failures, .. } => {
                failures.iter().map(|f| f.part_number).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Whether a transport call that produced this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("timeout")
                    || msg.contains("connection reset")
                    || msg.contains("connection refused")
                    || msg.contains("dispatch")
                    || msg.contains("503")
                    || msg.contains("service unavailable")
                    || msg.contains("429")
                    || msg.contains("too many requests")
                    || msg.contains("slow down")
                    || msg.contains("internalerror")
            }
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

fn cancel_suffix(aborted: &bool) -> &'static str {
    if *aborted { "" } else { " (session abort failed)" }
}

fn describe_multipart_failure(
    failures: &[PartFailure],
    partial_acks: &[PartAck],
    abort_error: &Option<String>,
) -> String {
    let mut msg = format!(
        "Multipart upload failed: {} part(s) failed, {} succeeded",
        failures.len(),
        partial_acks.len()
    );
    if let Some(first) = failures.first() {
        msg.push_str(&format!(" (first: part {}: {})", first.part_number, first.cause));
    }
    if let Some(abort) = abort_error {
        msg.push_str(&format!("; abort also failed: {abort}"));
    }
    msg
}
