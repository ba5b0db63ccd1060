//! Vendor-facing implementations of the capability traits.

pub mod open_api;
pub mod oss;
pub mod signer;

pub use open_api::OpenApiClient;
pub use oss::OssStore;
pub use signer::Md5Signer;
