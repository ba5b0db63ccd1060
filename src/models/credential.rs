//! Short-lived object-store credentials issued by the open API.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporary object-store access scoped to one bucket/object pair.
///
/// Deserializes directly from the `data` entries of the
/// `youku.video.upload.create` and `youku.video.upload.getsts` responses.
/// A refresh produces a new value; existing credentials are never mutated.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct UploadCredential {
    #[serde(default)]
    pub endpoint: String,

    #[serde(rename = "oss_bucket", default)]
    pub bucket: String,

    #[serde(rename = "oss_object", default)]
    pub object_key: String,

    #[serde(rename = "temp_access_id", default)]
    pub access_id: String,

    #[serde(rename = "temp_access_secret", default)]
    pub access_secret: String,

    #[serde(default)]
    pub security_token: String,

    /// Raw expiry as sent by the vendor (unix seconds or RFC 3339).
    #[serde(rename = "expire_time", default)]
    pub expiry: String,

    #[serde(default)]
    pub upload_token: String,

    #[serde(default)]
    pub vid: String,
}

impl UploadCredential {
    /// Parsed expiry, if the vendor sent one we understand.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(secs) = raw.parse::<i64>() {
            return Utc.timestamp_opt(secs, 0).single();
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Copy of this credential carrying the access secrets of `issued`.
    ///
    /// Endpoint, bucket, object key, upload token and vid are kept, so a
    /// renewed credential always addresses the same object.
    pub fn renewed(&self, issued: UploadCredential) -> Self {
        Self {
            access_id: issued.access_id,
            access_secret: issued.access_secret,
            security_token: issued.security_token,
            expiry: issued.expiry,
            ..self.clone()
        }
    }

    /// Copy of this credential redirected to another bucket.
    ///
    /// The object key, upload token and vid stay with the original issue.
    pub fn relocated(&self, location: &AlternateLocation) -> Self {
        Self {
            endpoint: location.endpoint.clone(),
            bucket: location.bucket.clone(),
            access_id: location.access_id.clone(),
            access_secret: location.access_secret.clone(),
            security_token: location.security_token.clone(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for UploadCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredential")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("object_key", &self.object_key)
            .field("access_id", &self.access_id)
            .field("access_secret", &"<redacted>")
            .field("security_token", &"<redacted>")
            .field("expiry", &self.expiry)
            .field("upload_token", &self.upload_token)
            .field("vid", &self.vid)
            .finish()
    }
}

/// Caller-supplied bucket to upload into instead of the vendor's default one
/// (cross-region save).
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct AlternateLocation {
    pub endpoint: String,
    pub bucket: String,
    pub access_id: String,
    pub access_secret: String,
    #[serde(default)]
    pub security_token: String,
}

impl fmt::Debug for AlternateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlternateLocation")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_id", &self.access_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_vendor_fields() {
        let json = r#"{
            "endpoint": "oss-cn-beijing.aliyuncs.com",
            "expire_time": "1700000000",
            "oss_bucket": "videos",
            "oss_object": "a/b.mp4",
            "security_token": "tok",
            "temp_access_id": "id",
            "temp_access_secret": "secret",
            "upload_token": "ut",
            "vid": "XNDE"
        }"#;
        let cred: UploadCredential = serde_json::from_str(json).unwrap();
        assert_eq!(cred.bucket, "videos");
        assert_eq!(cred.object_key, "a/b.mp4");
        assert_eq!(cred.access_secret, "secret");
        assert_eq!(cred.expires_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn debug_hides_secrets() {
        let cred = UploadCredential {
            access_secret: "hunter2".into(),
            security_token: "sts".into(),
            ..Default::default()
        };
        let out = format!("{:?}", cred);
        assert!(!out.contains("hunter2"));
        assert!(!out.contains("\"sts\""));
    }

    #[test]
    fn relocation_keeps_issue_identity() {
        let cred = UploadCredential {
            bucket: "cn".into(),
            object_key: "obj".into(),
            upload_token: "ut".into(),
            vid: "v".into(),
            ..Default::default()
        };
        let moved = cred.relocated(&AlternateLocation {
            endpoint: "oss-us-west-1.aliyuncs.com".into(),
            bucket: "us".into(),
            access_id: "a".into(),
            access_secret: "s".into(),
            security_token: String::new(),
        });
        assert_eq!(moved.bucket, "us");
        assert_eq!(moved.object_key, "obj");
        assert_eq!(moved.upload_token, "ut");
        assert_eq!(cred.bucket, "cn");
    }

    #[test]
    fn renewal_only_replaces_secrets() {
        let current = UploadCredential {
            endpoint: "oss-us-west-1.aliyuncs.com".into(),
            bucket: "us".into(),
            object_key: "obj".into(),
            access_id: "old".into(),
            upload_token: "ut".into(),
            vid: "v".into(),
            ..Default::default()
        };
        let issued = UploadCredential {
            endpoint: "oss-cn-beijing.aliyuncs.com".into(),
            bucket: "cn".into(),
            object_key: "other".into(),
            access_id: "new".into(),
            access_secret: "s2".into(),
            security_token: "sts2".into(),
            expiry: "1700003600".into(),
            ..Default::default()
        };

        let renewed = current.renewed(issued);
        assert_eq!(renewed.access_id, "new");
        assert_eq!(renewed.access_secret, "s2");
        assert_eq!(renewed.security_token, "sts2");
        assert_eq!(renewed.expiry, "1700003600");
        assert_eq!(renewed.endpoint, "oss-us-west-1.aliyuncs.com");
        assert_eq!(renewed.bucket, "us");
        assert_eq!(renewed.object_key, "obj");
        assert_eq!(renewed.upload_token, "ut");
        assert_eq!(renewed.vid, "v");
    }
}
