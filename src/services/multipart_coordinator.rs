//! Drive a multipart session from open to complete (or abort).

use crate::config::UploadSettings;
use crate::errors::{UploadError, UploadResult};
use crate::models::{Chunk, ContentSource, PartHandle, SessionId, UploadCredential, UploadRequest};
use crate::services::credential_provider::{CredentialCell, CredentialProvider};
use crate::services::part_uploader::PartUploader;
use crate::traits::{ObjectStore, UrlMethod};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of one remote multipart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    SessionOpen,
    AllPartsUploaded,
    Completed,
    Aborted,
}

/// Uploads every planned chunk of one object through a single session.
///
/// Parts go up one at a time. A part that cannot be stored aborts the
/// session; a failed completion leaves it for the store to expire.
pub struct MultipartCoordinator<'a> {
    store: &'a dyn ObjectStore,
    provider: &'a CredentialProvider,
    credentials: &'a CredentialCell,
    settings: &'a UploadSettings,
    cancel: &'a CancellationToken,
    state: SessionState,
    session: Option<SessionId>,
}

impl<'a> MultipartCoordinator<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        provider: &'a CredentialProvider,
        credentials: &'a CredentialCell,
        settings: &'a UploadSettings,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            provider,
            credentials,
            settings,
            cancel,
            state: SessionState::NotStarted,
            session: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Open the remote session. Called once per upload.
    pub async fn open(&mut self) -> UploadResult<SessionId> {
        if let Some(session) = &self.session {
            return Ok(session.clone());
        }
        let credential = self.credentials.current().await;
        let session = self.store.initiate_multipart(&credential).await?;
        info!(session = %session, "opened multipart session");
        self.session = Some(session.clone());
        self.state = SessionState::SessionOpen;
        Ok(session)
    }

    /// Upload the file at `path` as `chunks`, then complete the session.
    pub async fn upload_file(
        &mut self,
        path: &Path,
        chunks: &[Chunk],
    ) -> UploadResult<Vec<PartHandle>> {
        let mut file = File::open(path).await?;
        self.run(chunks, &mut file).await
    }

    /// Upload `chunks` read from `reader`, then complete the session.
    ///
    /// Returns the part handles in part-number order.
    pub async fn run<R>(&mut self, chunks: &[Chunk], reader: &mut R) -> UploadResult<Vec<PartHandle>>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        let session = self.open().await?;

        let parts = match self.upload_parts(&session, chunks, reader).await {
            Ok(parts) => parts,
            Err(err) => {
                error!(session = %session, error = %err, "multipart upload failed, aborting");
                self.abort(&session).await;
                return Err(err);
            }
        };
        self.state = SessionState::AllPartsUploaded;

        self.complete(&session, &parts).await?;
        Ok(parts)
    }

    async fn upload_parts<R>(
        &self,
        session: &SessionId,
        chunks: &[Chunk],
        reader: &mut R,
    ) -> UploadResult<Vec<PartHandle>>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
    {
        let uploader = PartUploader::new(
            self.store,
            self.provider,
            self.credentials,
            self.settings.part_attempts,
            self.settings.retry_delay,
            self.cancel,
        );

        let mut parts = BTreeMap::new();
        for chunk in chunks {
            if self.cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }
            let handle = uploader.upload_part(session, chunk, reader).await?;
            debug!(part = chunk.number, total = chunks.len(), "part done");
            parts.insert(handle.part_number, handle);
        }
        Ok(parts.into_values().collect())
    }

    /// Best-effort abort; failures are logged, not returned.
    async fn abort(&mut self, session: &SessionId) {
        self.state = SessionState::Aborted;
        let credential = self.credentials.current().await;
        match self.store.abort_multipart(&credential, session).await {
            Ok(()) => info!(session = %session, "aborted multipart session"),
            Err(err) => warn!(session = %session, error = %err, "abort failed"),
        }
    }

    async fn complete(&mut self, session: &SessionId, parts: &[PartHandle]) -> UploadResult<()> {
        let credential = self.credentials.current().await;
        self.store
            .complete_multipart(&credential, session, parts)
            .await
            .map_err(|err| {
                error!(session = %session, error = %err, "completing multipart upload failed");
                UploadError::FinalizeFailed(err.to_string())
            })?;
        self.state = SessionState::Completed;
        info!(session = %session, parts = parts.len(), "completed multipart session");
        Ok(())
    }
}

/// Upload the whole payload with one PUT to a signed URL. No session is used.
///
/// Cancellation drops the in-flight request.
pub async fn upload_single(
    store: &dyn ObjectStore,
    credential: &UploadCredential,
    request: &UploadRequest,
    settings: &UploadSettings,
    cancel: &CancellationToken,
) -> UploadResult<()> {
    let url = store
        .sign_url(credential, UrlMethod::Put, settings.sign_url_ttl)
        .await?;
    let put = async {
        match &request.source {
            ContentSource::Memory(content) => {
                store
                    .put_object_via_url(credential, &url, content.clone())
                    .await
            }
            ContentSource::File(path) => {
                store
                    .put_object_from_file_via_url(credential, &url, path)
                    .await
            }
        }
    };
    tokio::select! {
        _ = cancel.cancelled() => return Err(UploadError::Cancelled),
        result = put => result?,
    }
    info!(
        object = %credential.object_key,
        bytes = request.size_bytes,
        "uploaded object in a single request"
    );
    Ok(())
}
