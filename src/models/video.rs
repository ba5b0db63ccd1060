//! Video registration payloads.

use serde::{Deserialize, Serialize};

/// Result of a successful upload; consumed by the save/complete steps.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoData {
    #[serde(default)]
    pub vid: String,

    #[serde(default)]
    pub upload_token: String,

    /// Bucket the object was written to when an alternate location was used.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ow_oss_bucket: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ow_oss_object: String,
}

/// User-facing metadata saved alongside an uploaded video.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct VideoMetadata {
    pub title: String,

    /// Comma-separated tags.
    pub tags: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Copyright type, `original` or `reproduced`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_ids: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_custom: Option<String>,
}

impl VideoMetadata {
    pub fn new(title: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: tags.into(),
            ..Default::default()
        }
    }
}
