//! Register an uploaded object as a platform video.

use crate::errors::{UploadError, UploadResult};
use crate::models::params::{CompleteUploadParams, SaveVideoParams};
use crate::models::{ApiResponse, ToParams, VideoData, VideoMetadata};
use crate::traits::ApiTransport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const SAVE_ACTION: &str = "youku.video.upload.save";
pub const COMPLETE_ACTION: &str = "youku.video.upload.complete";

/// Saves video metadata and confirms the upload.
///
/// Both calls are keyed by the upload token on the server, so the
/// confirmation can be repeated safely.
#[derive(Clone)]
pub struct VideoRegistrar {
    api: Arc<dyn ApiTransport>,
    confirm_attempts: u32,
    retry_delay: Duration,
}

impl VideoRegistrar {
    pub fn new(api: Arc<dyn ApiTransport>, confirm_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            api,
            confirm_attempts: confirm_attempts.max(1),
            retry_delay,
        }
    }

    /// Save metadata for the upload. A single attempt; any failure is final.
    pub async fn save(&self, metadata: &VideoMetadata, upload_token: &str) -> UploadResult<VideoData> {
        let params = SaveVideoParams {
            metadata,
            upload_token,
        }
        .to_params();

        let saved = async {
            let body = self.api.post(SAVE_ACTION, params).await?;
            ApiResponse::<VideoData>::parse(&body)?.into_first(SAVE_ACTION)
        }
        .await
        .map_err(|err| UploadError::SaveFailed(err.to_string()))?;

        info!(vid = %saved.vid, title = %metadata.title, "saved video metadata");
        Ok(saved)
    }

    /// Confirm the upload, retrying on any error or empty answer.
    pub async fn complete(&self, data: &VideoData) -> UploadResult<VideoData> {
        let mut last_error = String::new();

        for attempt in 1..=self.confirm_attempts {
            match self.complete_once(data).await {
                Ok(confirmed) => {
                    info!(vid = %confirmed.vid, attempt, "upload confirmed");
                    return Ok(confirmed);
                }
                Err(err) => {
                    error!(
                        upload_token = %data.upload_token,
                        attempt,
                        max_attempts = self.confirm_attempts,
                        error = %err,
                        "complete video error"
                    );
                    last_error = err.to_string();
                }
            }
            if attempt < self.confirm_attempts && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        warn!(upload_token = %data.upload_token, "giving up on upload confirmation");
        Err(UploadError::ConfirmationExhausted {
            attempts: self.confirm_attempts,
            last_error,
        })
    }

    async fn complete_once(&self, data: &VideoData) -> UploadResult<VideoData> {
        let params = CompleteUploadParams { data }.to_params();
        let body = self.api.post(COMPLETE_ACTION, params).await?;
        ApiResponse::<VideoData>::parse(&body)?.into_first(COMPLETE_ACTION)
    }

    /// Save, then confirm. Either step failing is final.
    pub async fn register_and_confirm(
        &self,
        metadata: &VideoMetadata,
        data: &VideoData,
    ) -> UploadResult<VideoData> {
        self.save(metadata, &data.upload_token).await?;
        self.complete(data).await
    }
}
