//! Capability traits the pipeline consumes.
//!
//! The upload pipeline never talks to the vendor directly. Request signing,
//! open API transport and the object store are reached through these traits
//! so that the retry and session logic can run against in-memory fakes.

use crate::errors::{StoreResult, UploadResult};
use crate::models::{Params, PartHandle, SessionId, UploadCredential};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::time::Duration;

/// Signs open API parameters with the client secret.
pub trait Signer: Send + Sync {
    fn sign(&self, params: &Params, secret: &str) -> String;
}

/// Sends an open API action and returns the raw response body.
///
/// Implementations must reject bodies whose envelope reports a negative
/// error code.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(&self, action: &str, params: Params) -> UploadResult<Bytes>;

    async fn post(&self, action: &str, params: Params) -> UploadResult<Bytes>;
}

/// HTTP method a signed URL is valid for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlMethod {
    Get,
    Put,
}

impl UrlMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlMethod::Get => "GET",
            UrlMethod::Put => "PUT",
        }
    }
}

/// Object-store operations used by the upload pipeline.
///
/// Every call takes the credential explicitly; the caller decides which
/// credential is current.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presign a URL for the credential's object.
    async fn sign_url(
        &self,
        credential: &UploadCredential,
        method: UrlMethod,
        expires_in: Duration,
    ) -> StoreResult<String>;

    /// PUT an in-memory payload to a signed URL.
    async fn put_object_via_url(
        &self,
        credential: &UploadCredential,
        url: &str,
        body: Bytes,
    ) -> StoreResult<()>;

    /// PUT a file to a signed URL, streaming it from disk.
    async fn put_object_from_file_via_url(
        &self,
        credential: &UploadCredential,
        url: &str,
        path: &Path,
    ) -> StoreResult<()>;

    /// Open a multipart session for the credential's object.
    async fn initiate_multipart(&self, credential: &UploadCredential) -> StoreResult<SessionId>;

    /// Store one part of an open session.
    async fn upload_part(
        &self,
        credential: &UploadCredential,
        session: &SessionId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<PartHandle>;

    /// Assemble the object from parts, in part-number order.
    async fn complete_multipart(
        &self,
        credential: &UploadCredential,
        session: &SessionId,
        parts: &[PartHandle],
    ) -> StoreResult<()>;

    /// Discard an open session and its stored parts.
    async fn abort_multipart(
        &self,
        credential: &UploadCredential,
        session: &SessionId,
    ) -> StoreResult<()>;
}
