//! Multipart upload engine
//!
//! A file is split into fixed-size [`PartRange`]s by the [`planner`], each
//! range is sent by the [`uploader`] under a bounded concurrency limit, the
//! [`progress`] aggregator turns part completions into a percentage, and the
//! [`coordinator`] commits the sorted acknowledgements (or aborts the session).

pub mod coordinator;
pub mod manifest;
pub mod planner;
pub mod progress;
pub mod source;
pub mod uploader;

use serde::Serialize;

pub use coordinator::{UploadCoordinator, UploadOptions, UploadState};
pub use manifest::CommitManifest;
pub use planner::{MAX_PARTS, plan};
pub use progress::{ProgressAggregator, ProgressFn};
pub use source::{FileSource, MemorySource, PartSource};
pub use uploader::upload_part;

/// Server-side multipart session, immutable once opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub session_id: String,
    pub bucket: String,
    pub key: String,
    pub content_type: String,
}

/// Contiguous byte range uploaded as one part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// 1-based part number
    pub part_number: u32,
    pub offset: u64,
    pub length: u64,
}

/// Acknowledgement of one successfully uploaded part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartAck {
    pub part_number: u32,
    /// Opaque tag (ETag) required to reference the part at commit
    pub integrity_tag: String,
}

impl PartAck {
    pub fn new(part_number: u32, integrity_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            integrity_tag: integrity_tag.into(),
        }
    }
}

/// Entry of the final commit list handed to the transport
pub type CompletedPart = PartAck;

/// A part that did not produce an acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartFailure {
    pub part_number: u32,
    pub cause: String,
}

impl PartFailure {
    pub fn new(part_number: u32, cause: impl Into<String>) -> Self {
        Self {
            part_number,
            cause: cause.into(),
        }
    }
}

/// Outcome of a committed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub committed: bool,
    /// Location reported by the storage service (falls back to the key)
    pub location: String,
    pub key: String,
    /// Multipart session id; `None` when the object went up in a single request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub size: u64,
    pub parts: usize,
}
