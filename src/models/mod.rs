//! Data models for the upload pipeline.
//!
//! Wire-facing types derive `serde` so vendor JSON maps straight onto them;
//! request parameters are projected to key/value form through `ToParams`.

pub mod credential;
pub mod multipart;
pub mod params;
pub mod request;
pub mod response;
pub mod video;

pub use credential::{AlternateLocation, UploadCredential};
pub use multipart::{Chunk, PartHandle, SessionId};
pub use params::{Params, ToParams};
pub use request::{ContentSource, UploadRequest};
pub use response::{ApiResponse, ResponseError, TokenResponse};
pub use video::{VideoData, VideoMetadata};
