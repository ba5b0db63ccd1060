//! Outbound API: build an upload from a buffer or file and run the pipeline.

use crate::config::UploadSettings;
use crate::errors::{UploadError, UploadResult};
use crate::models::{AlternateLocation, ContentSource, UploadRequest, VideoData, VideoMetadata};
use crate::services::chunk_planner;
use crate::services::credential_provider::{CredentialCell, CredentialProvider};
use crate::services::multipart_coordinator::{MultipartCoordinator, upload_single};
use crate::services::video_registrar::VideoRegistrar;
use crate::traits::{ApiTransport, ObjectStore};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Entry point holding the open API transport, the object store and settings.
#[derive(Clone)]
pub struct UploadClient {
    api: Arc<dyn ApiTransport>,
    store: Arc<dyn ObjectStore>,
    settings: UploadSettings,
    cancel: CancellationToken,
}

impl UploadClient {
    pub fn new(
        api: Arc<dyn ApiTransport>,
        store: Arc<dyn ObjectStore>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            api,
            store,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` to cancel every upload started from this client.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Prepare an upload of an in-memory buffer.
    pub fn upload_buffer(&self, content: impl Into<Bytes>, name: impl Into<String>) -> Uploader {
        Uploader::new(self.clone(), UploadRequest::from_bytes(content, name))
    }

    /// Prepare an upload of a file. The file is hashed now.
    pub async fn upload_file(&self, path: impl Into<PathBuf>) -> UploadResult<Uploader> {
        let request = UploadRequest::from_file(path).await?;
        Ok(Uploader::new(self.clone(), request))
    }

    pub fn registrar(&self) -> VideoRegistrar {
        VideoRegistrar::new(
            self.api.clone(),
            self.settings.confirm_attempts,
            self.settings.retry_delay,
        )
    }

    /// Save metadata for an uploaded video and confirm it.
    pub async fn save_video(
        &self,
        metadata: &VideoMetadata,
        data: &VideoData,
    ) -> UploadResult<VideoData> {
        self.registrar().register_and_confirm(metadata, data).await
    }
}

/// One prepared upload. The request (and its checksum) is fixed.
pub struct Uploader {
    client: UploadClient,
    request: UploadRequest,
    id: Uuid,
}

impl Uploader {
    fn new(client: UploadClient, request: UploadRequest) -> Self {
        Self {
            client,
            request,
            id: Uuid::new_v4(),
        }
    }

    pub fn request(&self) -> &UploadRequest {
        &self.request
    }

    /// Upload the content to the object store.
    ///
    /// With `chunked`, a non-empty file goes up in parts through a multipart
    /// session; buffers, empty files and unchunked files use one signed PUT.
    /// `alternate` redirects the upload to a caller-owned bucket.
    pub async fn upload(
        &self,
        chunked: bool,
        alternate: Option<&AlternateLocation>,
    ) -> UploadResult<VideoData> {
        let span = info_span!("upload", id = %self.id, name = %self.request.display_name);
        let cancel = self.client.cancel.child_token();

        let Some(limit) = self.client.settings.deadline else {
            return self
                .transfer(chunked, alternate, &cancel)
                .instrument(span)
                .await;
        };

        let transfer = self.transfer(chunked, alternate, &cancel).instrument(span);
        tokio::pin!(transfer);
        tokio::select! {
            result = &mut transfer => return result,
            _ = tokio::time::sleep(limit) => {}
        }

        // Let the pipeline observe cancellation so an open session is aborted.
        warn!(id = %self.id, ?limit, "upload deadline reached, cancelling");
        cancel.cancel();
        match tokio::time::timeout(self.client.settings.cancel_grace, transfer).await {
            Ok(Err(UploadError::Cancelled)) => Err(UploadError::DeadlineExceeded(limit)),
            Ok(other) => other,
            Err(_) => {
                warn!(id = %self.id, "upload did not settle after cancellation, dropping it");
                Err(UploadError::DeadlineExceeded(limit))
            }
        }
    }

    /// Upload, then save `metadata` and confirm the video.
    pub async fn upload_and_register(
        &self,
        metadata: &VideoMetadata,
        chunked: bool,
    ) -> UploadResult<VideoData> {
        let data = self.upload(chunked, None).await?;
        self.client.save_video(metadata, &data).await
    }

    async fn transfer(
        &self,
        chunked: bool,
        alternate: Option<&AlternateLocation>,
        cancel: &CancellationToken,
    ) -> UploadResult<VideoData> {
        let settings = &self.client.settings;
        let store = self.client.store.as_ref();
        let provider = CredentialProvider::new(self.client.api.clone(), settings.client_origin.clone());

        let issued = provider.fetch(&self.request).await?;
        let credential = match alternate {
            Some(location) => issued.relocated(location),
            None => issued.clone(),
        };
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        match &self.request.source {
            ContentSource::File(path) if chunked && self.request.size_bytes > 0 => {
                let chunks = chunk_planner::plan(path, settings.part_size).await?;
                info!(parts = chunks.len(), bytes = self.request.size_bytes, "uploading in parts");
                let cell = CredentialCell::new(credential.clone());
                let mut coordinator =
                    MultipartCoordinator::new(store, &provider, &cell, settings, cancel);
                coordinator.upload_file(path, &chunks).await?;
            }
            _ => upload_single(store, &credential, &self.request, settings, cancel).await?,
        }

        let mut data = VideoData {
            vid: issued.vid,
            upload_token: issued.upload_token,
            ..Default::default()
        };
        if let Some(location) = alternate {
            data.ow_oss_bucket = location.bucket.clone();
            data.ow_oss_object = credential.object_key.clone();
        }
        Ok(data)
    }
}
