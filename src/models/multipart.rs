//! Parts of a multipart upload: planned chunks and the proofs returned for them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default part size for multipart uploads (5 MiB).
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Upper bound on parts in a single multipart session.
pub const MAX_PARTS: u64 = 10_000;

/// A contiguous byte range of a file, uploaded as one part.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Part number (1-based).
    pub number: u32,

    /// Byte offset of the first byte of this part.
    pub offset: u64,

    /// Size in bytes.
    pub size: u64,
}

impl Chunk {
    /// Offset one past the last byte of this part.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Proof that one part was stored, required to complete the session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PartHandle {
    /// Part number (1-based).
    pub part_number: u32,

    /// ETag returned by the store for this part.
    pub etag: String,
}

/// Remote multipart session id, bound to one object key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId {
    pub object_key: String,
    pub upload_id: String,
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object_key, self.upload_id)
    }
}
