//! Client for a video platform's open API upload flow.
//!
//! Uploads media to the vendor's object store under short-lived STS
//! credentials (in 5 MiB parts for files, or one signed PUT) and registers
//! the result as a video.
//!
//! ```no_run
//! # async fn run() -> video_upload::errors::UploadResult<()> {
//! use std::{sync::Arc, time::Duration};
//! use video_upload::{OpenApiClient, OssStore, UploadClient, UploadSettings, VideoMetadata};
//!
//! let api = OpenApiClient::new(
//!     video_upload::config::DEFAULT_API_URL,
//!     "client-id",
//!     "client-secret",
//!     Duration::from_secs(60),
//! )?
//! .with_access_token("access-token");
//! let store = OssStore::new(Duration::from_secs(120))?;
//! let client = UploadClient::new(Arc::new(api), Arc::new(store), UploadSettings::default());
//!
//! let uploader = client.upload_file("holiday.mp4").await?;
//! let video = uploader
//!     .upload_and_register(&VideoMetadata::new("Holiday", "travel"), true)
//!     .await?;
//! println!("vid = {}", video.vid);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod traits;

pub use adapters::{Md5Signer, OpenApiClient, OssStore};
pub use config::{ClientOrigin, UploadSettings};
pub use errors::{StoreError, UploadError, UploadResult};
pub use models::{AlternateLocation, VideoData, VideoMetadata};
pub use services::{UploadClient, Uploader};
