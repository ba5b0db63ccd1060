//! Error taxonomy for the upload pipeline.
//!
//! `StoreError` is what an object-store backend reports for a single call;
//! `UploadError` is what the pipeline surfaces to callers once retry budgets
//! are spent or a non-retryable condition is hit.

use std::io;
use thiserror::Error;

/// Object-store error codes that mean the temporary credential was rejected.
const CREDENTIAL_ERROR_CODES: [&str; 3] = [
    "InvalidAccessKeyId",
    "SecurityTokenExpired",
    "InvalidSecurityToken",
];

/// Failure reported by an object-store call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The access credential is invalid or expired. Triggers a refresh.
    #[error("credential rejected ({code}): {message}")]
    Auth { code: String, message: String },

    /// The store answered with an error document.
    #[error("object store returned {status} ({code}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    /// Network-level failure before a response was read.
    #[error("object store transport error: {0}")]
    Transport(String),

    /// A response arrived but could not be understood.
    #[error("unexpected object store response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Classify an error document by its `<Code>`.
    pub fn from_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let message = message.into();
        if CREDENTIAL_ERROR_CODES.contains(&code.as_str()) {
            StoreError::Auth { code, message }
        } else {
            StoreError::Service {
                status,
                code,
                message,
            }
        }
    }

    /// Returns true if the credential should be refreshed before retrying.
    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Auth { .. })
    }

    /// Whether another attempt of the same call may succeed.
    ///
    /// Local I/O failures (the part could not be read) are final.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::Io(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Primary error type for upload and registration operations.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Open API request could not be sent or its body could not be read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The vendor envelope carried a negative error code.
    #[error("upstream error {code}: {message}")]
    Upstream { code: i64, message: String },

    /// The vendor answered successfully but with no `data` entries.
    #[error("`{action}` returned no data")]
    EmptyResponse { action: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// One part failed on every attempt. The multipart session was aborted.
    #[error("part {part} failed after {attempts} attempts: {last_error}")]
    PartExhausted {
        part: u32,
        attempts: u32,
        last_error: String,
    },

    /// All parts were stored but the session could not be completed.
    #[error("completing multipart upload failed: {0}")]
    FinalizeFailed(String),

    /// Saving video metadata failed. Not retried.
    #[error("saving video failed: {0}")]
    SaveFailed(String),

    /// The completion confirmation failed on every attempt.
    #[error("upload confirmation failed after {attempts} attempts: {last_error}")]
    ConfirmationExhausted { attempts: u32, last_error: String },

    #[error("part size must be greater than zero")]
    InvalidPartSize,

    #[error("{parts} parts exceeds the limit of {limit}")]
    TooManyParts { parts: u64, limit: u64 },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("upload cancelled")]
    Cancelled,

    #[error("upload did not finish within {0:?}")]
    DeadlineExceeded(std::time::Duration),
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        UploadError::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
