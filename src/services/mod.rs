//! Upload pipeline services, leaf-first: hashing, credentials, planning,
//! part upload, session coordination, registration, and the facade.

pub mod chunk_planner;
pub mod credential_provider;
pub mod hasher;
pub mod multipart_coordinator;
pub mod part_uploader;
pub mod uploader;
pub mod video_registrar;

pub use credential_provider::{CredentialCell, CredentialProvider};
pub use multipart_coordinator::{MultipartCoordinator, SessionState};
pub use part_uploader::PartUploader;
pub use uploader::{UploadClient, Uploader};
pub use video_registrar::VideoRegistrar;
