//! dk-core: Core library for devkit
//!
//! This crate provides:
//! - Configuration management and the authorization gate
//! - Object key naming
//! - The multipart upload engine (planner, part uploader, progress, coordinator)
//! - The `StorageTransport` trait the engine drives
//!
//! It does not depend on any storage SDK; `dk-s3` plugs in aws-sdk-s3.

pub mod auth;
pub mod config;
pub mod error;
pub mod key;
pub mod multipart;
pub mod retry;
pub mod storage;
pub mod traits;

pub use auth::{AuthGate, DevKit};
pub use config::{Config, ConfigManager, Credentials, RetryConfig, StorageConfig, UploadConfig};
pub use error::{Error, Result};
pub use multipart::{
    CompletedPart, FileSource, MemorySource, PartAck, PartFailure, PartRange, PartSource,
    ProgressFn, UploadCoordinator, UploadOptions, UploadResult, UploadSession, UploadState,
};
pub use retry::retry_with_backoff;
pub use storage::Storage;
pub use traits::StorageTransport;
