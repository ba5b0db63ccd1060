//! Typed request parameters and their key/value projections.
//!
//! The open API takes flat string parameters. Each request type spells out
//! its own projection instead of round-tripping through JSON.

use super::{UploadCredential, UploadRequest, VideoData, VideoMetadata};
use std::collections::BTreeMap;

/// Flat, ordered request parameters.
pub type Params = BTreeMap<String, String>;

/// Projection of a typed request onto open API parameters.
pub trait ToParams {
    fn to_params(&self) -> Params;
}

fn insert_opt(params: &mut Params, key: &str, value: Option<&String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        params.insert(key.to_string(), value.clone());
    }
}

/// `youku.video.upload.create`
#[derive(Debug)]
pub struct CreateUploadParams<'a> {
    pub request: &'a UploadRequest,
    pub client_ip: Option<String>,
}

impl ToParams for CreateUploadParams<'_> {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("file_name".into(), self.request.display_name.clone());
        params.insert("file_size".into(), self.request.size_bytes.to_string());
        params.insert("file_md5".into(), self.request.checksum.clone());
        params.insert("server_type".into(), "oupload".into());
        insert_opt(&mut params, "client_ip", self.client_ip.as_ref());
        params
    }
}

/// `youku.video.upload.getsts`
#[derive(Debug)]
pub struct RefreshStsParams<'a> {
    pub credential: &'a UploadCredential,
}

impl ToParams for RefreshStsParams<'_> {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("upload_token".into(), self.credential.upload_token.clone());
        params.insert("oss_bucket".into(), self.credential.bucket.clone());
        params.insert("oss_object".into(), self.credential.object_key.clone());
        params
    }
}

/// `youku.video.upload.save`
#[derive(Debug)]
pub struct SaveVideoParams<'a> {
    pub metadata: &'a VideoMetadata,
    pub upload_token: &'a str,
}

impl ToParams for SaveVideoParams<'_> {
    fn to_params(&self) -> Params {
        let meta = self.metadata;
        let mut params = Params::new();
        params.insert("title".into(), meta.title.clone());
        params.insert("tags".into(), meta.tags.clone());
        insert_opt(&mut params, "description", meta.description.as_ref());
        insert_opt(&mut params, "original", meta.original.as_ref());
        insert_opt(&mut params, "category_name", meta.category_name.as_ref());
        insert_opt(&mut params, "subcategory_ids", meta.subcategory_ids.as_ref());
        insert_opt(&mut params, "thumbnail_custom", meta.thumbnail_custom.as_ref());
        params.insert("upload_token".into(), self.upload_token.to_string());
        params
    }
}

/// `youku.video.upload.complete`
#[derive(Debug)]
pub struct CompleteUploadParams<'a> {
    pub data: &'a VideoData,
}

impl ToParams for CompleteUploadParams<'_> {
    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("upload_token".into(), self.data.upload_token.clone());
        insert_opt(&mut params, "ow_oss_bucket", Some(&self.data.ow_oss_bucket));
        insert_opt(&mut params, "ow_oss_object", Some(&self.data.ow_oss_object));
        params
    }
}

/// `youku.user.authorize.token.get`
#[derive(Debug)]
pub struct AuthorizeCodeParams<'a> {
    pub code: &'a str,
}

impl ToParams for AuthorizeCodeParams<'_> {
    fn to_params(&self) -> Params {
        Params::from([("code".to_string(), self.code.to_string())])
    }
}

/// `youku.user.authorize.token.refresh`
#[derive(Debug)]
pub struct RefreshTokenParams<'a> {
    pub refresh_token: &'a str,
}

impl ToParams for RefreshTokenParams<'_> {
    fn to_params(&self) -> Params {
        Params::from([("refreshToken".to_string(), self.refresh_token.to_string())])
    }
}
