//! The content to upload, with its size and checksum fixed at construction.

use crate::services::hasher;
use bytes::Bytes;
use std::{io, path::PathBuf};
use tokio::fs;

/// Where the upload payload comes from.
#[derive(Clone, Debug)]
pub enum ContentSource {
    Memory(Bytes),
    File(PathBuf),
}

/// An immutable upload request.
///
/// The checksum is computed exactly once, when the request is built.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub source: ContentSource,
    pub display_name: String,
    pub size_bytes: u64,
    pub checksum: String,
}

impl UploadRequest {
    /// Build a request over an in-memory buffer.
    pub fn from_bytes(content: impl Into<Bytes>, display_name: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            size_bytes: content.len() as u64,
            checksum: hasher::checksum(&content),
            display_name: display_name.into(),
            source: ContentSource::Memory(content),
        }
    }

    /// Build a request over a file on disk.
    ///
    /// Stats and hashes the file; fails if either is impossible.
    pub async fn from_file(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let meta = fs::metadata(&path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let checksum = hasher::checksum_file(&path).await?;
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            source: ContentSource::File(path),
            display_name,
            size_bytes: meta.len(),
            checksum,
        })
    }
}
