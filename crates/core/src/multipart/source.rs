//! Byte sources for part uploads
//!
//! Parts are read concurrently, so a source never shares a read cursor between
//! calls: [`FileSource`] opens its own handle per range and [`MemorySource`]
//! hands out cheap `Bytes` slices.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{Error, Result};

/// Something an upload can read byte ranges from
#[async_trait]
pub trait PartSource: Send + Sync {
    /// File name used for the key extension and content-type guess
    fn name(&self) -> &str;

    /// Total size in bytes
    fn size(&self) -> u64;

    /// Explicit content type, if the caller knows it
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Read exactly `length` bytes starting at `offset`
    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes>;
}

/// A file on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    size: u64,
    content_type: Option<String>,
}

impl FileSource {
    /// Open `path`, failing with [`Error::InvalidArgument`] if it is not a readable file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::InvalidArgument(format!("file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        if !metadata.is_file() {
            return Err(Error::InvalidArgument(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            content_type: None,
        })
    }

    /// Override the guessed content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PartSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// In-memory payload, e.g. data produced by the caller rather than read from disk
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Bytes,
    content_type: Option<String>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
impl PartSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    async fn read_range(&self, offset: u64, length: u64) -> Result<Bytes> {
        let start = offset as usize;
        let end = start
            .checked_add(length as usize)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "range {offset}+{length} outside {}-byte source",
                    self.data.len()
                ))
            })?;
        Ok(self.data.slice(start..end))
    }
}
