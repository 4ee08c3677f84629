//! S3 storage transport
//!
//! Wraps aws-sdk-s3 and implements the `StorageTransport` trait from dk-core.
//! Every request goes through `retry_with_backoff`, so transient network
//! failures are retried here and never reach the upload coordinator.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use bytes::Bytes;
use dk_core::{
    CompletedPart, Error, Result, RetryConfig, StorageConfig, StorageTransport, UploadSession,
    retry_with_backoff,
};

/// aws-sdk-s3 backed transport
pub struct S3Transport {
    inner: aws_sdk_s3::Client,
    retry: RetryConfig,
    endpoint: Option<String>,
    region: String,
}

impl S3Transport {
    /// Build a client from the storage configuration
    pub async fn new(storage: &StorageConfig, retry: RetryConfig) -> Result<Self> {
        storage.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            storage.credentials.access_key.clone(),
            storage.credentials.secret_key.clone(),
            None, // session token
            None, // expiry
            "devkit-static-credentials",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(storage.region.clone()));
        if let Some(endpoint) = &storage.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        // Custom endpoints (MinIO, RustFS) usually need path-style addressing
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(storage.force_path_style || storage.endpoint.is_some())
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            retry,
            endpoint: storage.endpoint.clone(),
            region: storage.region.clone(),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    /// Public URL of an object, used when the service does not return one
    fn object_url(&self, bucket: &str, key: &str) -> String {
        object_url(self.endpoint.as_deref(), &self.region, bucket, key)
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &aws_sdk_s3::error::SdkError<E>) -> String {
        match error {
            aws_sdk_s3::error::SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {err}");
                if let Some(code) = meta.headers().get("x-amz-error-code") {
                    msg.push_str(&format!(" (code: {code})"));
                }
                msg.push_str(&format!(" [status {}]", meta.status().as_u16()));
                msg
            }
            aws_sdk_s3::error::SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {err:?}")
            }
            aws_sdk_s3::error::SdkError::TimeoutError(_) => "Request timeout".to_string(),
            aws_sdk_s3::error::SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {err:?}")
            }
            aws_sdk_s3::error::SdkError::ResponseError(err) => {
                format!("Response error: {err:?}")
            }
            _ => error.to_string(),
        }
    }

    fn network_error<E: std::fmt::Display>(error: aws_sdk_s3::error::SdkError<E>) -> Error {
        Error::Network(Self::format_sdk_error(&error))
    }
}

/// Classify a failed delete; a missing key becomes [`Error::NotFound`]
fn delete_error(msg: String, bucket: &str, key: &str) -> Error {
    if msg.contains("NoSuchKey") || msg.contains("NotFound") {
        tracing::warn!(bucket, key, "object to delete does not exist");
        Error::NotFound(format!("{bucket}/{key}"))
    } else {
        Error::Network(msg)
    }
}

fn object_url(endpoint: Option<&str>, region: &str, bucket: &str, key: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
    }
}

#[async_trait]
impl StorageTransport for S3Transport {
    async fn open_multipart_session(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String> {
        let response = retry_with_backoff(&self.retry, "create_multipart_upload", move || {
            async move {
                self.inner
                    .create_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .content_type(content_type)
                    .send()
                    .await
                    .map_err(Self::network_error)
            }
        })
        .await?;

        Ok(response.upload_id().unwrap_or_default().to_string())
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: u32,
        data: Bytes,
    ) -> Result<String> {
        let part_number = i32::try_from(part_number).map_err(|_| {
            Error::InvalidArgument(format!("part number {part_number} out of range"))
        })?;

        let response = retry_with_backoff(&self.retry, "upload_part", move || {
            let body = ByteStream::from(data.clone());
            async move {
                self.inner
                    .upload_part()
                    .bucket(&session.bucket)
                    .key(&session.key)
                    .upload_id(&session.session_id)
                    .part_number(part_number)
                    .body(body)
                    .send()
                    .await
                    .map_err(Self::network_error)
            }
        })
        .await?;

        Ok(response.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_multipart_session(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<String> {
        let mut completed = Vec::with_capacity(parts.len());
        for part in parts {
            let part_number = i32::try_from(part.part_number).map_err(|_| {
                Error::InvalidArgument(format!("part number {} out of range", part.part_number))
            })?;
            completed.push(
                S3CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(&part.integrity_tag)
                    .build(),
            );
        }
        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed))
            .build();
        let upload = &upload;

        let response = retry_with_backoff(&self.retry, "complete_multipart_upload", move || {
            async move {
                self.inner
                    .complete_multipart_upload()
                    .bucket(&session.bucket)
                    .key(&session.key)
                    .upload_id(&session.session_id)
                    .multipart_upload(upload.clone())
                    .send()
                    .await
                    .map_err(Self::network_error)
            }
        })
        .await?;

        match response.location() {
            Some(location) => Ok(location.to_string()),
            None => {
                tracing::debug!(
                    key = %session.key,
                    "service returned no location, using object URL"
                );
                Ok(self.object_url(&session.bucket, &session.key))
            }
        }
    }

    async fn abort_multipart_session(&self, session: &UploadSession) -> Result<()> {
        retry_with_backoff(&self.retry, "abort_multipart_upload", move || async move {
            self.inner
                .abort_multipart_upload()
                .bucket(&session.bucket)
                .key(&session.key)
                .upload_id(&session.session_id)
                .send()
                .await
                .map_err(Self::network_error)
        })
        .await?;

        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String> {
        retry_with_backoff(&self.retry, "put_object", move || {
            let body = ByteStream::from(data.clone());
            async move {
                self.inner
                    .put_object()
                    .bucket(bucket)
                    .key(key)
                    .content_type(content_type)
                    .body(body)
                    .send()
                    .await
                    .map_err(Self::network_error)
            }
        })
        .await?;

        Ok(self.object_url(bucket, key))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        retry_with_backoff(&self.retry, "delete_object", move || async move {
            self.inner
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| delete_error(Self::format_sdk_error(&e), bucket, key))
        })
        .await?;

        Ok(())
    }
}
