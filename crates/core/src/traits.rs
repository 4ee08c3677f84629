//! Storage transport trait
//!
//! The upload engine talks to storage only through [`StorageTransport`], so it
//! stays independent of any particular SDK. `dk-s3` provides the aws-sdk-s3
//! implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::multipart::{CompletedPart, UploadSession};

/// Operations the multipart engine needs from an object-storage service
///
/// Implementations own connection handling, request signing and per-call
/// retries. Every method is a single logical request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageTransport: Send + Sync {
    /// Start a multipart session and return its opaque id
    async fn open_multipart_session(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String>;

    /// Upload one part and return the integrity tag (ETag) the service assigned
    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: u32,
        data: Bytes,
    ) -> Result<String>;

    /// Commit the session from `parts`, which arrive sorted by part number
    async fn complete_multipart_session(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<String>;

    /// Discard the session and every part uploaded to it
    async fn abort_multipart_session(&self, session: &UploadSession) -> Result<()>;

    /// Upload a whole object in one request and return its location
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}
