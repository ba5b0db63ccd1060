//! Partition a file into fixed-size, offset-addressed parts.

use crate::errors::{UploadError, UploadResult};
use crate::models::multipart::{Chunk, MAX_PARTS};
use std::path::Path;
use tokio::fs;

/// Plan the parts of the file at `path`. Only the file size is read.
pub async fn plan(path: &Path, part_size: u64) -> UploadResult<Vec<Chunk>> {
    let size = fs::metadata(path).await?.len();
    plan_for_size(size, part_size)
}

/// Plan the parts of `size` bytes.
///
/// Every part is `part_size` bytes except the last, which holds the
/// remainder. An empty input yields no parts.
pub fn plan_for_size(size: u64, part_size: u64) -> UploadResult<Vec<Chunk>> {
    if part_size == 0 {
        return Err(UploadError::InvalidPartSize);
    }
    let count = size.div_ceil(part_size);
    if count > MAX_PARTS {
        return Err(UploadError::TooManyParts {
            parts: count,
            limit: MAX_PARTS,
        });
    }

    let chunks = (0..count)
        .map(|index| {
            let offset = index * part_size;
            Chunk {
                number: index as u32 + 1,
                offset,
                size: part_size.min(size - offset),
            }
        })
        .collect();
    Ok(chunks)
}
