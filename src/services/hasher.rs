//! Content checksums (MD5, lowercase hex).

use md5::Context;
use std::{io, path::Path};
use tokio::{fs::File, io::AsyncReadExt};

/// Block size used when hashing files.
const FILE_BLOCK_SIZE: usize = 8 * 1024;

/// Checksum of an in-memory buffer.
pub fn checksum(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}

/// Checksum of a file, streamed in fixed-size blocks into one running digest.
///
/// Memory use is constant regardless of file size.
pub async fn checksum_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path).await?;
    let mut digest = Context::new();
    let mut block = vec![0u8; FILE_BLOCK_SIZE];
    loop {
        let read = file.read(&mut block).await?;
        if read == 0 {
            break;
        }
        digest.consume(&block[..read]);
    }
    Ok(format!("{:x}", digest.compute()))
}
