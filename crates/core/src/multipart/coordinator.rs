//! Upload coordinator
//!
//! Drives one upload from authorization to commit:
//!
//! ```text
//! Created -> SessionOpen -> PartsInFlight -> Completing -> Committed
//!     \__________\_______________\______________\__> Aborting -> Aborted
//! ```
//!
//! Parts run through `buffer_unordered`, so at most `concurrency` are in
//! flight and all of them return before the coordinator decides between
//! commit and abort.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::manifest::CommitManifest;
use super::planner::plan;
use super::progress::{ProgressAggregator, ProgressFn};
use super::source::PartSource;
use super::uploader::upload_part;
use super::{PartAck, PartFailure, UploadResult, UploadSession};
use crate::auth::AuthGate;
use crate::config::UploadConfig;
use crate::error::{Error, Result};
use crate::key::{guess_content_type, object_key, unique_file_name};
use crate::traits::StorageTransport;

/// Failure cause recorded for parts skipped after cancellation
const CANCELLED_BEFORE_START: &str = "cancelled before start";

/// Per-upload settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub part_size: u64,
    /// Maximum parts uploading at any instant
    pub concurrency: usize,
    /// Folder placed between the project prefix and the file name
    pub folder: Option<String>,
    /// Send objects that fit in one part as a single PUT
    pub single_shot: bool,
}

impl UploadOptions {
    pub fn folder(mut self, folder: Option<impl Into<String>>) -> Self {
        self.folder = folder.map(Into::into);
        self
    }

    pub fn part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn single_shot(mut self, single_shot: bool) -> Self {
        self.single_shot = single_shot;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(Error::InvalidArgument(
                "part size must be greater than zero".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidArgument(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&UploadConfig> for UploadOptions {
    fn from(config: &UploadConfig) -> Self {
        Self {
            part_size: config.part_size,
            concurrency: config.concurrency,
            folder: None,
            single_shot: config.single_shot,
        }
    }
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

/// Lifecycle of a multipart session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Created,
    SessionOpen,
    PartsInFlight,
    Completing,
    Committed,
    Aborting,
    Aborted,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Committed | UploadState::Aborted)
    }

    pub fn can_transition_to(self, next: UploadState) -> bool {
        use UploadState::*;
        match (self, next) {
            (Created, SessionOpen)
            | (SessionOpen, PartsInFlight)
            | (PartsInFlight, Completing)
            | (Completing, Committed)
            | (Aborting, Aborted) => true,
            (from, Aborting) => !from.is_terminal() && from != Aborting,
            _ => false,
        }
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadState::Created => "created",
            UploadState::SessionOpen => "session-open",
            UploadState::PartsInFlight => "parts-in-flight",
            UploadState::Completing => "completing",
            UploadState::Committed => "committed",
            UploadState::Aborting => "aborting",
            UploadState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Current state of one run plus the key it is writing, for logging
struct Lifecycle<'a> {
    state: UploadState,
    key: &'a str,
}

impl<'a> Lifecycle<'a> {
    fn new(key: &'a str) -> Self {
        Self {
            state: UploadState::Created,
            key,
        }
    }

    fn advance(&mut self, next: UploadState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::General(format!(
                "illegal upload transition {} -> {next}",
                self.state
            )));
        }
        tracing::debug!(key = self.key, from = %self.state, to = %next, "upload state");
        self.state = next;
        Ok(())
    }
}

/// Owns multipart sessions end to end
#[derive(Clone)]
pub struct UploadCoordinator {
    transport: Arc<dyn StorageTransport>,
    gate: Arc<dyn AuthGate>,
}

impl UploadCoordinator {
    pub fn new(transport: Arc<dyn StorageTransport>, gate: Arc<dyn AuthGate>) -> Self {
        Self { transport, gate }
    }

    /// Upload `source` and resolve only once the object is committed
    pub async fn start(
        &self,
        source: &dyn PartSource,
        options: &UploadOptions,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadResult> {
        self.start_with_cancel(source, options, on_progress, &CancellationToken::new())
            .await
    }

    /// Like [`start`](Self::start), but stops dispatching parts once `cancel`
    /// fires, drains the parts already in flight and aborts the session
    pub async fn start_with_cancel(
        &self,
        source: &dyn PartSource,
        options: &UploadOptions,
        on_progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> Result<UploadResult> {
        options.validate()?;
        self.gate.ensure_authorized()?;

        let storage = self.gate.current_config();
        if storage.bucket.is_empty() {
            return Err(Error::Config("storage bucket is not set".to_string()));
        }

        let key = object_key(
            storage.project_prefix.as_deref(),
            options.folder.as_deref(),
            &unique_file_name(source.name()),
        );
        let content_type = source
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(source.name()));
        let size = source.size();
        let ranges = plan(size, options.part_size)?;
        let progress = ProgressAggregator::new(ranges.len(), on_progress);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled { aborted: true });
        }

        if ranges.len() == 1 && options.single_shot {
            return self
                .put_single(source, &storage.bucket, &key, &content_type, &progress)
                .await;
        }

        let mut lifecycle = Lifecycle::new(&key);

        let session_id = self
            .transport
            .open_multipart_session(&storage.bucket, &key, &content_type)
            .await
            .map_err(|e| Error::SessionOpenFailed(e.to_string()))?;
        if session_id.is_empty() {
            return Err(Error::SessionOpenFailed(
                "storage returned an empty session id".to_string(),
            ));
        }

        let session = UploadSession {
            session_id,
            bucket: storage.bucket.clone(),
            key: key.clone(),
            content_type,
        };
        let mut guard = SessionGuard::arm(self.transport.clone(), session.clone());
        lifecycle.advance(UploadState::SessionOpen)?;

        let total_parts = ranges.len();
        tracing::debug!(
            key = %session.key,
            session_id = %session.session_id,
            total_parts,
            concurrency = options.concurrency,
            "dispatching parts"
        );
        lifecycle.advance(UploadState::PartsInFlight)?;

        let transport = self.transport.as_ref();
        let session_ref = &session;
        let progress_ref = &progress;
        let outcomes: Vec<std::result::Result<PartAck, PartFailure>> =
            futures::stream::iter(ranges)
                .map(|range| async move {
                    if cancel.is_cancelled() {
                        return Err(PartFailure::new(range.part_number, CANCELLED_BEFORE_START));
                    }
                    upload_part(transport, session_ref, range, source, progress_ref)
                        .await
                        .map_err(|e| match e {
                            Error::PartUploadFailed { part_number, cause } => {
                                PartFailure::new(part_number, cause)
                            }
                            other => PartFailure::new(range.part_number, other.to_string()),
                        })
                })
                .buffer_unordered(options.concurrency)
                .collect()
                .await;

        let mut acks = Vec::with_capacity(total_parts);
        let mut failures: Vec<PartFailure> = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(ack) => acks.push(ack),
                Err(failure) => failures.push(failure),
            }
        }

        // Skipped parts only matter when nothing else went wrong
        failures.retain(|f| f.cause != CANCELLED_BEFORE_START);

        if failures.is_empty() && cancel.is_cancelled() {
            lifecycle.advance(UploadState::Aborting)?;
            let abort_error = self.abort(&session).await;
            guard.disarm();
            lifecycle.advance(UploadState::Aborted)?;
            return Err(Error::Cancelled {
                aborted: abort_error.is_none(),
            });
        }

        if !failures.is_empty() {
            lifecycle.advance(UploadState::Aborting)?;
            let abort_error = self.abort(&session).await;
            guard.disarm();
            lifecycle.advance(UploadState::Aborted)?;
            acks.sort_by_key(|ack| ack.part_number);
            return Err(Error::MultipartUploadFailed {
                partial_acks: acks,
                failures,
                abort_error,
            });
        }

        let manifest = match CommitManifest::new(acks, total_parts) {
            Ok(manifest) => manifest,
            Err(e) => {
                lifecycle.advance(UploadState::Aborting)?;
                let abort_error = self.abort(&session).await;
                guard.disarm();
                lifecycle.advance(UploadState::Aborted)?;
                return Err(match abort_error {
                    Some(_) => Error::General(with_abort_error(e.to_string(), abort_error)),
                    None => e,
                });
            }
        };

        lifecycle.advance(UploadState::Completing)?;
        let location = match self
            .transport
            .complete_multipart_session(&session, manifest.parts())
            .await
        {
            Ok(location) => location,
            Err(e) => {
                lifecycle.advance(UploadState::Aborting)?;
                let abort_error = self.abort(&session).await;
                guard.disarm();
                lifecycle.advance(UploadState::Aborted)?;
                return Err(Error::CommitFailed(with_abort_error(
                    e.to_string(),
                    abort_error,
                )));
            }
        };
        guard.disarm();
        lifecycle.advance(UploadState::Committed)?;

        tracing::info!(
            key = %session.key,
            parts = manifest.len(),
            size,
            "multipart upload committed"
        );

        Ok(UploadResult {
            committed: true,
            location: if location.is_empty() {
                session.key.clone()
            } else {
                location
            },
            key: session.key,
            session_id: Some(session.session_id),
            size,
            parts: manifest.len(),
        })
    }

    /// Single-request path for objects that fit in one part
    async fn put_single(
        &self,
        source: &dyn PartSource,
        bucket: &str,
        key: &str,
        content_type: &str,
        progress: &ProgressAggregator,
    ) -> Result<UploadResult> {
        let size = source.size();
        let failed = |cause: String| Error::PartUploadFailed {
            part_number: 1,
            cause,
        };

        let data = source
            .read_range(0, size)
            .await
            .map_err(|e| failed(format!("read failed: {e}")))?;
        let location = self
            .transport
            .put_object(bucket, key, data, content_type)
            .await
            .map_err(|e| failed(e.to_string()))?;

        progress.finish();
        tracing::info!(key, size, "object uploaded in a single request");

        Ok(UploadResult {
            committed: true,
            location: if location.is_empty() {
                key.to_string()
            } else {
                location
            },
            key: key.to_string(),
            session_id: None,
            size,
            parts: 1,
        })
    }

    /// Best-effort abort; returns the failure message instead of raising it
    async fn abort(&self, session: &UploadSession) -> Option<String> {
        match self.transport.abort_multipart_session(session).await {
            Ok(()) => {
                tracing::debug!(key = %session.key, session_id = %session.session_id, "session aborted");
                None
            }
            Err(e) => {
                tracing::warn!(
                    key = %session.key,
                    session_id = %session.session_id,
                    error = %e,
                    "failed to abort multipart session"
                );
                Some(e.to_string())
            }
        }
    }
}

/// Append the abort failure, if any, to an upload error message
fn with_abort_error(message: String, abort_error: Option<String>) -> String {
    match abort_error {
        Some(abort) => format!("{message}; abort also failed: {abort}"),
        None => message,
    }
}

/// Aborts an open session when the upload future is dropped before it
/// reaches commit or an explicit abort
struct SessionGuard {
    transport: Arc<dyn StorageTransport>,
    session: Option<UploadSession>,
}

impl SessionGuard {
    fn arm(transport: Arc<dyn StorageTransport>, session: UploadSession) -> Self {
        Self {
            transport,
            session: Some(session),
        }
    }

    fn disarm(&mut self) {
        self.session = None;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = self.transport.clone();
                handle.spawn(async move {
                    tracing::debug!(
                        key = %session.key,
                        session_id = %session.session_id,
                        "upload dropped, aborting session"
                    );
                    if let Err(e) = transport.abort_multipart_session(&session).await {
                        tracing::warn!(
                            key = %session.key,
                            session_id = %session.session_id,
                            error = %e,
                            "failed to abort session of dropped upload"
                        );
                    }
                });
            }
            Err(_) => tracing::warn!(
                key = %session.key,
                session_id = %session.session_id,
                "upload dropped outside a runtime, session left open"
            ),
        }
    }
}
