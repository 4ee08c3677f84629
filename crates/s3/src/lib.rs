//! dk-s3: aws-sdk-s3 adapter for devkit
//!
//! Implements `dk_core::StorageTransport` on top of aws-sdk-s3 so the upload
//! engine can talk to AWS S3 and S3-compatible services.

mod client;

pub use client::S3Transport;
