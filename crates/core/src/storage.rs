//! Caller-facing storage helper
//!
//! [`Storage`] bundles an initialized [`DevKit`] with a transport and exposes
//! the operations applications call directly.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{AuthGate, DevKit};
use crate::config::UploadConfig;
use crate::error::{Error, Result};
use crate::multipart::{PartSource, ProgressFn, UploadCoordinator, UploadOptions, UploadResult};
use crate::traits::StorageTransport;

/// Upload and delete objects in the configured bucket
#[derive(Clone)]
pub struct Storage {
    kit: Arc<DevKit>,
    transport: Arc<dyn StorageTransport>,
    coordinator: UploadCoordinator,
}

impl Storage {
    pub fn new(kit: DevKit, transport: Arc<dyn StorageTransport>) -> Self {
        let kit = Arc::new(kit);
        let coordinator = UploadCoordinator::new(transport.clone(), kit.clone());
        Self {
            kit,
            transport,
            coordinator,
        }
    }

    /// Upload defaults from the configuration
    pub fn defaults(&self) -> &UploadConfig {
        &self.kit.config().upload
    }

    /// Multipart upload with an explicit part size
    pub async fn upload_large(
        &self,
        source: &dyn PartSource,
        on_progress: Option<ProgressFn>,
        folder: Option<&str>,
        part_size: u64,
    ) -> Result<UploadResult> {
        let options = UploadOptions::from(self.defaults())
            .folder(folder)
            .part_size(part_size);
        self.coordinator.start(source, &options, on_progress).await
    }

    /// Upload with the configured part size and concurrency
    pub async fn upload_file(
        &self,
        source: &dyn PartSource,
        on_progress: Option<ProgressFn>,
        folder: Option<&str>,
    ) -> Result<UploadResult> {
        let options = UploadOptions::from(self.defaults()).folder(folder);
        self.coordinator.start(source, &options, on_progress).await
    }

    /// Upload with full control over options and cancellation
    pub async fn upload_with(
        &self,
        source: &dyn PartSource,
        options: &UploadOptions,
        on_progress: Option<ProgressFn>,
        cancel: &CancellationToken,
    ) -> Result<UploadResult> {
        self.coordinator
            .start_with_cancel(source, options, on_progress, cancel)
            .await
    }

    /// Delete `key` from the configured bucket
    pub async fn delete_object(&self, key: &str) -> Result<bool> {
        if key.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "key is required to delete an object".to_string(),
            ));
        }
        self.kit.ensure_authorized()?;

        let bucket = &self.kit.current_config().bucket;
        self.transport.delete_object(bucket, key).await?;
        tracing::debug!(bucket = %bucket, key, "object deleted");
        Ok(true)
    }
}
