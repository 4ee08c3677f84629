//! Single part upload

use super::progress::ProgressAggregator;
use super::source::PartSource;
use super::{PartAck, PartRange, UploadSession};
use crate::error::{Error, Result};
use crate::traits::StorageTransport;

/// Upload one range of `source` into `session`
///
/// Every failure, including a read error or a response without an integrity
/// tag, comes back as [`Error::PartUploadFailed`]. Progress is recorded once,
/// after the acknowledgement is known to be valid.
pub async fn upload_part(
    transport: &dyn StorageTransport,
    session: &UploadSession,
    range: PartRange,
    source: &dyn PartSource,
    progress: &ProgressAggregator,
) -> Result<PartAck> {
    let part_number = range.part_number;
    let failed = |cause: String| Error::PartUploadFailed { part_number, cause };

    let data = source
        .read_range(range.offset, range.length)
        .await
        .map_err(|e| failed(format!("read failed: {e}")))?;

    if data.len() as u64 != range.length {
        return Err(failed(format!(
            "read {} bytes, expected {}",
            data.len(),
            range.length
        )));
    }

    let tag = transport
        .upload_part(session, part_number, data)
        .await
        .map_err(|e| failed(e.to_string()))?;

    if tag.trim().is_empty() {
        return Err(failed("missing integrity tag".to_string()));
    }

    progress.on_part_complete();
    tracing::debug!(
        part_number,
        offset = range.offset,
        length = range.length,
        "part uploaded"
    );

    Ok(PartAck::new(part_number, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::MemorySource;
    use crate::traits::MockStorageTransport;
    use std::sync::{Arc, Mutex};

    fn session() -> UploadSession {
        UploadSession {
            session_id: "upload-1".to_string(),
            bucket: "media".to_string(),
            key: "acme/clip.mp4".to_string(),
            content_type: "video/mp4".to_string(),
        }
    }

    fn counting_progress() -> (ProgressAggregator, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress =
            ProgressAggregator::new(2, Some(Arc::new(move |p: u8| sink.lock().unwrap().push(p))));
        (progress, seen)
    }

    #[tokio::test]
    async fn test_uploads_exact_range() {
        let mut transport = MockStorageTransport::new();
        transport
            .expect_upload_part()
            .withf(|session, part, data| {
                session.session_id == "upload-1" && *part == 2 && &data[..] == b"world"
            })
            .times(1)
            .returning(|_, _, _| Ok("\"etag-2\"".to_string()));

        let source = MemorySource::new("clip.mp4", b"hello world".to_vec());
        let (progress, seen) = counting_progress();
        let range = PartRange {
            part_number: 2,
            offset: 6,
            length: 5,
        };

        let ack = upload_part(&transport, &session(), range, &source, &progress)
            .await
            .unwrap();

        assert_eq!(ack, PartAck::new(2, "\"etag-2\""));
        assert_eq!(progress.completed_parts(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![50]);
    }

    #[tokio::test]
    async fn test_empty_tag_is_failure() {
        let mut transport = MockStorageTransport::new();
        transport
            .expect_upload_part()
            .returning(|_, _, _| Ok(String::new()));

        let source = MemorySource::new("clip.mp4", b"abc".to_vec());
        let (progress, seen) = counting_progress();
        let range = PartRange {
            part_number: 1,
            offset: 0,
            length: 3,
        };

        let err = upload_part(&transport, &session(), range, &source, &progress)
            .await
            .unwrap_err();

        match err {
            Error::PartUploadFailed { part_number, cause } => {
                assert_eq!(part_number, 1);
                assert_eq!(cause, "missing integrity tag");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(progress.completed_parts(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_is_part_failure() {
        let mut transport = MockStorageTransport::new();
        transport
            .expect_upload_part()
            .returning(|_, _, _| Err(Error::Network("connection reset".to_string())));

        let source = MemorySource::new("clip.mp4", b"abc".to_vec());
        let (progress, _) = counting_progress();
        let range = PartRange {
            part_number: 1,
            offset: 0,
            length: 3,
        };

        let err = upload_part(&transport, &session(), range, &source, &progress)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PartUploadFailed { part_number: 1, .. }));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(progress.completed_parts(), 0);
    }

    #[tokio::test]
    async fn test_read_error_skips_transport() {
        let mut transport = MockStorageTransport::new();
        transport.expect_upload_part().times(0);

        let source = MemorySource::new("clip.mp4", b"abc".to_vec());
        let (progress, _) = counting_progress();
        let range = PartRange {
            part_number: 2,
            offset: 2,
            length: 10,
        };

        let err = upload_part(&transport, &session(), range, &source, &progress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PartUploadFailed { part_number: 2, .. }));
    }
}
