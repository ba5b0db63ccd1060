//! Vendor response envelopes.

use crate::errors::{UploadError, UploadResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// The `e` object every open API response carries.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ResponseError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_msg: String,
}

impl ResponseError {
    /// A negative `code` or `error_code` is a failure whatever the HTTP status.
    pub fn is_failure(&self) -> bool {
        self.code < 0 || self.error_code < 0
    }

    pub fn to_error(&self) -> UploadError {
        let code = if self.error_code < 0 {
            self.error_code
        } else {
            self.code
        };
        let message = if self.error_msg.is_empty() {
            self.desc.clone()
        } else {
            self.error_msg.clone()
        };
        UploadError::Upstream { code, message }
    }
}

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "e", default)]
    error: ResponseError,
}

/// Reject a body whose envelope reports a negative error code.
pub fn check_envelope(body: &[u8]) -> UploadResult<()> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if envelope.error.is_failure() {
        return Err(envelope.error.to_error());
    }
    Ok(())
}

/// Standard envelope with a list of typed `data` entries.
#[derive(Deserialize, Debug)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ApiResponse<T> {
    #[serde(rename = "e", default)]
    pub error: ResponseError,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub data: Option<Vec<T>>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Decode a body, failing on a negative vendor error code.
    pub fn parse(body: &[u8]) -> UploadResult<Self> {
        let resp: Self = serde_json::from_slice(body)?;
        if resp.error.is_failure() {
            return Err(resp.error.to_error());
        }
        Ok(resp)
    }

    /// The first `data` entry, or `EmptyResponse` for `action`.
    pub fn into_first(self, action: &str) -> UploadResult<T> {
        self.data
            .and_then(|data| data.into_iter().next())
            .ok_or_else(|| UploadError::EmptyResponse {
                action: action.to_string(),
            })
    }
}

/// Access token issued by the authorize endpoints.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct AccessToken {
    #[serde(rename = "expireTime", default)]
    pub expire_time: i64,
    #[serde(rename = "rexpireTime", default)]
    pub refresh_expire_time: i64,
    #[serde(rename = "startTime", default)]
    pub start_time: i64,
    #[serde(rename = "accessToken", default)]
    pub access_token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: String,
    #[serde(rename = "openId", default)]
    pub open_id: String,
}

/// Response of `youku.user.authorize.token.get` / `.refresh`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct TokenResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(rename = "errText", default)]
    pub err_text: String,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub token: AccessToken,
}

impl TokenResponse {
    pub fn parse(body: &[u8]) -> UploadResult<Self> {
        let resp: Self = serde_json::from_slice(body)?;
        if resp.errno != 0 {
            return Err(UploadError::Upstream {
                code: resp.errno,
                message: resp.err_text,
            });
        }
        Ok(resp)
    }
}
