//! Issue and refresh temporary object-store credentials.

use crate::config::ClientOrigin;
use crate::errors::UploadResult;
use crate::models::params::{CreateUploadParams, RefreshStsParams};
use crate::models::{ApiResponse, ToParams, UploadCredential, UploadRequest};
use crate::traits::ApiTransport;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const CREATE_ACTION: &str = "youku.video.upload.create";
pub const REFRESH_ACTION: &str = "youku.video.upload.getsts";

/// Exchanges API session state for object-store credentials.
#[derive(Clone)]
pub struct CredentialProvider {
    api: Arc<dyn ApiTransport>,
    origin: ClientOrigin,
}

impl CredentialProvider {
    pub fn new(api: Arc<dyn ApiTransport>, origin: ClientOrigin) -> Self {
        Self { api, origin }
    }

    /// Request a credential (and upload token / vid) for a new upload.
    pub async fn fetch(&self, request: &UploadRequest) -> UploadResult<UploadCredential> {
        let params = CreateUploadParams {
            request,
            client_ip: self.client_ip(),
        }
        .to_params();
        let body = self.api.post(CREATE_ACTION, params).await?;
        let credential = ApiResponse::<UploadCredential>::parse(&body)?.into_first(CREATE_ACTION)?;
        info!(
            vid = %credential.vid,
            bucket = %credential.bucket,
            object = %credential.object_key,
            "issued upload credential"
        );
        Ok(credential)
    }

    /// Re-issue access secrets for the same bucket/object pair.
    ///
    /// Safe to call on a still-valid credential; it simply yields a new one.
    pub async fn refresh(&self, existing: &UploadCredential) -> UploadResult<UploadCredential> {
        let params = RefreshStsParams {
            credential: existing,
        }
        .to_params();
        let body = self.api.post(REFRESH_ACTION, params).await?;
        let credential = ApiResponse::<UploadCredential>::parse(&body)?.into_first(REFRESH_ACTION)?;
        debug!(bucket = %credential.bucket, "refreshed upload credential");
        Ok(credential)
    }

    fn client_ip(&self) -> Option<String> {
        match &self.origin {
            ClientOrigin::Random => Some(random_ipv4()),
            ClientOrigin::Fixed(ip) => Some(ip.clone()),
            ClientOrigin::Omit => None,
        }
    }
}

fn random_ipv4() -> String {
    let mut rng = rand::rng();
    format!(
        "{}.{}.{}.{}",
        rng.random_range(1..=200),
        rng.random_range(1..=100),
        rng.random_range(50..100),
        rng.random_range(1..=200)
    )
}

/// The credential currently used by an upload.
///
/// Readers take a snapshot before each attempt. A refresh replaces the
/// snapshot for everyone; concurrent refreshes of the same stale credential
/// collapse into one.
pub struct CredentialCell {
    current: Mutex<Arc<UploadCredential>>,
}

impl CredentialCell {
    pub fn new(credential: UploadCredential) -> Self {
        Self {
            current: Mutex::new(Arc::new(credential)),
        }
    }

    pub async fn current(&self) -> Arc<UploadCredential> {
        self.current.lock().await.clone()
    }

    /// Replace `stale` with a credential carrying freshly issued secrets.
    ///
    /// Only the secrets are taken from the refresh; the replacement still
    /// addresses the bucket and object of `stale`. If `stale` was already
    /// replaced, the newer credential is returned without another round trip.
    pub async fn refresh(
        &self,
        stale: &Arc<UploadCredential>,
        provider: &CredentialProvider,
    ) -> UploadResult<Arc<UploadCredential>> {
        let mut current = self.current.lock().await;
        if !Arc::ptr_eq(&current, stale) {
            return Ok(current.clone());
        }
        let issued = provider.refresh(stale).await?;
        let fresh = Arc::new(stale.renewed(issued));
        *current = fresh.clone();
        Ok(fresh)
    }
}
