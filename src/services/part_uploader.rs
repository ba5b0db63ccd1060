//! Upload one part with bounded retry and credential refresh.

use crate::errors::{UploadError, UploadResult};
use crate::models::{Chunk, PartHandle, SessionId};
use crate::services::credential_provider::{CredentialCell, CredentialProvider};
use crate::traits::ObjectStore;
use bytes::Bytes;
use std::{io::SeekFrom, time::Duration};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Uploads parts of one multipart session.
///
/// The credential is taken from the shared cell before every attempt, so a
/// refresh made while uploading one part carries over to all later parts.
pub struct PartUploader<'a> {
    store: &'a dyn ObjectStore,
    provider: &'a CredentialProvider,
    credentials: &'a CredentialCell,
    max_attempts: u32,
    retry_delay: Duration,
    cancel: &'a CancellationToken,
}

impl<'a> PartUploader<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        provider: &'a CredentialProvider,
        credentials: &'a CredentialCell,
        max_attempts: u32,
        retry_delay: Duration,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            provider,
            credentials,
            max_attempts: max_attempts.max(1),
            retry_delay,
            cancel,
        }
    }

    /// Upload `chunk`, reading its bytes from `reader` at `chunk.offset`.
    ///
    /// The reader is repositioned before every attempt. Credential rejections
    /// refresh the shared credential (unless no attempt is left); other
    /// retryable store failures are retried after `retry_delay`. Running out
    /// of attempts yields `PartExhausted`. Refresh failures, read errors,
    /// non-retryable store errors and cancellation end the part at once.
    pub async fn upload_part<R>(
        &self,
        session: &SessionId,
        chunk: &Chunk,
        reader: &mut R,
    ) -> UploadResult<PartHandle>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let body = read_chunk(reader, chunk).await?;
            let credential = self.credentials.current().await;

            match self
                .store
                .upload_part(&credential, session, chunk.number, body)
                .await
            {
                Ok(handle) => {
                    debug!(part = chunk.number, attempt, etag = %handle.etag, "part stored");
                    return Ok(handle);
                }
                Err(err) if err.is_auth() => {
                    warn!(
                        part = chunk.number,
                        attempt,
                        error = %err,
                        "credential rejected, refreshing"
                    );
                    last_error = err.to_string();
                    if attempt < self.max_attempts {
                        self.credentials.refresh(&credential, self.provider).await?;
                    }
                }
                Err(err) if !err.is_retryable() => {
                    warn!(part = chunk.number, attempt, error = %err, "part upload failed for good");
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(
                        part = chunk.number,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "part upload failed"
                    );
                    last_error = err.to_string();
                    if attempt < self.max_attempts {
                        self.pause().await?;
                    }
                }
            }
        }

        Err(UploadError::PartExhausted {
            part: chunk.number,
            attempts: self.max_attempts,
            last_error,
        })
    }

    async fn pause(&self) -> UploadResult<()> {
        if self.retry_delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            _ = tokio::time::sleep(self.retry_delay) => Ok(()),
        }
    }
}

/// Read exactly the bytes of `chunk`.
async fn read_chunk<R>(reader: &mut R, chunk: &Chunk) -> UploadResult<Bytes>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    reader.seek(SeekFrom::Start(chunk.offset)).await?;
    let mut buf = vec![0u8; chunk.size as usize];
    reader.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}
