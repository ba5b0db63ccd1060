//! HTTP client for the open API router.
//!
//! Every call carries an `opensysparams` JSON object (action, client id,
//! timestamp, version, optional access token and the request signature)
//! next to the business parameters.

use crate::adapters::signer::Md5Signer;
use crate::errors::{UploadError, UploadResult};
use crate::models::params::{AuthorizeCodeParams, RefreshTokenParams};
use crate::models::response::check_envelope;
use crate::models::{Params, ToParams, TokenResponse};
use crate::traits::{ApiTransport, Signer};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "3.0";
const RESPONSE_FORMAT: &str = "json";

pub const AUTHORIZE_ACTION: &str = "youku.user.authorize.token.get";
pub const REFRESH_TOKEN_ACTION: &str = "youku.user.authorize.token.refresh";

#[derive(Serialize, Debug)]
struct SysParams<'a> {
    action: &'a str,
    client_id: &'a str,
    format: &'static str,
    timestamp: String,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    sign: String,
}

/// Open API transport over HTTP.
#[derive(Clone)]
pub struct OpenApiClient {
    client: Client,
    url: String,
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
    signer: Arc<dyn Signer>,
}

impl OpenApiClient {
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> UploadResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| UploadError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            access_token: None,
            signer: Arc::new(Md5Signer),
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> UploadResult<TokenResponse> {
        let params = AuthorizeCodeParams { code }.to_params();
        let body = self.get(AUTHORIZE_ACTION, params).await?;
        TokenResponse::parse(&body)
    }

    /// Obtain a new access token from a refresh token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> UploadResult<TokenResponse> {
        let params = RefreshTokenParams { refresh_token }.to_params();
        let body = self.get(REFRESH_TOKEN_ACTION, params).await?;
        TokenResponse::parse(&body)
    }

    /// Serialized, signed `opensysparams` for `action`.
    fn sys_params(&self, action: &str, params: &Params) -> UploadResult<String> {
        let timestamp = Utc::now().timestamp().to_string();

        let mut signed = params.clone();
        signed.insert("action".into(), action.to_string());
        signed.insert("client_id".into(), self.client_id.clone());
        signed.insert("format".into(), RESPONSE_FORMAT.into());
        signed.insert("timestamp".into(), timestamp.clone());
        signed.insert("version".into(), API_VERSION.into());
        if let Some(token) = &self.access_token {
            signed.insert("access_token".into(), token.clone());
        }

        let sys = SysParams {
            action,
            client_id: &self.client_id,
            format: RESPONSE_FORMAT,
            timestamp,
            version: API_VERSION,
            access_token: self.access_token.as_deref(),
            sign: self.signer.sign(&signed, &self.client_secret),
        };
        Ok(serde_json::to_string(&sys)?)
    }

    fn form(&self, action: &str, params: Params) -> UploadResult<Vec<(String, String)>> {
        let sys = self.sys_params(action, &params)?;
        let mut form: Vec<(String, String)> = params.into_iter().collect();
        form.push(("opensysparams".into(), sys));
        Ok(form)
    }

    async fn finish(&self, action: &str, response: reqwest::Response) -> UploadResult<Bytes> {
        let status = response.status();
        let body = response.bytes().await?;
        debug!(action, %status, bytes = body.len(), "open api response");
        check_response(action, status, &body)?;
        Ok(body)
    }
}

/// Accept a response only if both the HTTP status and the envelope succeed.
///
/// A vendor error in the envelope wins over the HTTP status; a non-2xx
/// status without a readable envelope is a transport error.
fn check_response(action: &str, status: StatusCode, body: &[u8]) -> UploadResult<()> {
    match check_envelope(body) {
        Err(UploadError::Decode(_)) if !status.is_success() => Err(UploadError::Transport(
            format!("{} returned HTTP {}", action, status),
        )),
        Err(err) => Err(err),
        Ok(()) if !status.is_success() => Err(UploadError::Transport(format!(
            "{} returned HTTP {}",
            action, status
        ))),
        Ok(()) => Ok(()),
    }
}

#[async_trait]
impl ApiTransport for OpenApiClient {
    async fn get(&self, action: &str, params: Params) -> UploadResult<Bytes> {
        let query = self.form(action, params)?;
        debug!(action, url = %self.url, "open api GET");
        let response = self.client.get(&self.url).query(&query).send().await?;
        self.finish(action, response).await
    }

    async fn post(&self, action: &str, params: Params) -> UploadResult<Bytes> {
        let form = self.form(action, params)?;
        debug!(action, url = %self.url, "open api POST");
        let response = self.client.post(&self.url).form(&form).send().await?;
        self.finish(action, response).await
    }
}
