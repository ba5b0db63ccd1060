//! Object store client for OSS-style buckets reached with STS credentials.
//!
//! Requests are signed with the V1 header scheme
//! (`Authorization: OSS {id}:{base64(hmac-sha1)}`); single-part uploads go
//! through presigned URLs.

use crate::errors::{StoreError, StoreResult};
use crate::models::{PartHandle, SessionId, UploadCredential};
use crate::traits::{ObjectStore, UrlMethod};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Body, Client, Method, header};
use sha1::Sha1;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

type HmacSha1 = Hmac<Sha1>;

const SECURITY_TOKEN_HEADER: &str = "x-oss-security-token";
const XML_CONTENT_TYPE: &str = "application/xml";

/// OSS REST client.
#[derive(Clone)]
pub struct OssStore {
    client: Client,
}

impl OssStore {
    pub fn new(timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self { client })
    }

    /// Virtual-hosted URL of the credential's object.
    fn object_url(credential: &UploadCredential) -> String {
        let (scheme, host) = split_endpoint(&credential.endpoint);
        format!(
            "{}://{}.{}/{}",
            scheme,
            credential.bucket,
            host,
            encode_key(&credential.object_key)
        )
    }

    /// Send a header-signed request for the credential's object.
    ///
    /// `subresource` is the raw query (`uploads`, `partNumber=1&uploadId=..`),
    /// already sorted as the signature requires.
    async fn send(
        &self,
        credential: &UploadCredential,
        method: Method,
        subresource: &str,
        content_type: Option<&str>,
        body: Option<Body>,
    ) -> StoreResult<reqwest::Response> {
        let date = http_date();
        let mut oss_headers = Vec::new();
        if !credential.security_token.is_empty() {
            oss_headers.push((SECURITY_TOKEN_HEADER, credential.security_token.as_str()));
        }
        let resource = canonical_resource(credential, subresource);
        let string_to_sign = string_to_sign(
            method.as_str(),
            "",
            content_type.unwrap_or(""),
            &date,
            &oss_headers,
            &resource,
        );
        let signature = sign(&credential.access_secret, &string_to_sign);

        let mut url = Self::object_url(credential);
        if !subresource.is_empty() {
            url.push('?');
            url.push_str(subresource);
        }
        debug!(%method, %url, "oss request");

        let mut request = self
            .client
            .request(method, &url)
            .header(header::DATE, &date)
            .header(
                header::AUTHORIZATION,
                format!("OSS {}:{}", credential.access_id, signature),
            );
        for (name, value) in oss_headers {
            request = request.header(name, value);
        }
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        ensure_success(response).await
    }
}

#[async_trait]
impl ObjectStore for OssStore {
    async fn sign_url(
        &self,
        credential: &UploadCredential,
        method: UrlMethod,
        expires_in: Duration,
    ) -> StoreResult<String> {
        let expires = (Utc::now().timestamp() + expires_in.as_secs() as i64).to_string();
        let subresource = if credential.security_token.is_empty() {
            String::new()
        } else {
            format!("security-token={}", credential.security_token)
        };
        let resource = canonical_resource(credential, &subresource);
        let string_to_sign = string_to_sign(method.as_str(), "", "", &expires, &[], &resource);
        let signature = sign(&credential.access_secret, &string_to_sign);

        let mut url = format!(
            "{}?OSSAccessKeyId={}&Expires={}&Signature={}",
            Self::object_url(credential),
            urlencoding::encode(&credential.access_id),
            expires,
            urlencoding::encode(&signature)
        );
        if !credential.security_token.is_empty() {
            url.push_str("&security-token=");
            url.push_str(&urlencoding::encode(&credential.security_token));
        }
        Ok(url)
    }

    async fn put_object_via_url(
        &self,
        _credential: &UploadCredential,
        url: &str,
        body: Bytes,
    ) -> StoreResult<()> {
        let response = self.client.put(url).body(body).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn put_object_from_file_via_url(
        &self,
        _credential: &UploadCredential,
        url: &str,
        path: &Path,
    ) -> StoreResult<()> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_LENGTH, len)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn initiate_multipart(&self, credential: &UploadCredential) -> StoreResult<SessionId> {
        let response = self
            .send(credential, Method::POST, "uploads", None, None)
            .await?;
        let body = response.text().await?;
        let upload_id = xml_tag(&body, "UploadId").ok_or_else(|| {
            StoreError::InvalidResponse("InitiateMultipartUploadResult without UploadId".into())
        })?;
        Ok(SessionId {
            object_key: credential.object_key.clone(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        credential: &UploadCredential,
        session: &SessionId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<PartHandle> {
        let subresource = format!("partNumber={}&uploadId={}", part_number, session.upload_id);
        let response = self
            .send(credential, Method::PUT, &subresource, None, Some(Body::from(body)))
            .await?;
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"').to_string())
            .ok_or_else(|| StoreError::InvalidResponse(format!("part {} without ETag", part_number)))?;
        Ok(PartHandle { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        credential: &UploadCredential,
        session: &SessionId,
        parts: &[PartHandle],
    ) -> StoreResult<()> {
        let subresource = format!("uploadId={}", session.upload_id);
        let xml = complete_multipart_xml(parts);
        self.send(
            credential,
            Method::POST,
            &subresource,
            Some(XML_CONTENT_TYPE),
            Some(Body::from(xml)),
        )
        .await?;
        Ok(())
    }

    async fn abort_multipart(
        &self,
        credential: &UploadCredential,
        session: &SessionId,
    ) -> StoreResult<()> {
        let subresource = format!("uploadId={}", session.upload_id);
        self.send(credential, Method::DELETE, &subresource, None, None)
            .await?;
        Ok(())
    }
}

/// Map a non-2xx response to a `StoreError` using its `<Code>`/`<Message>`.
async fn ensure_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let code = xml_tag(&body, "Code").unwrap_or_else(|| status.as_str().to_string());
    let message = xml_tag(&body, "Message").unwrap_or_else(|| "unknown error".to_string());
    Err(StoreError::from_code(status.as_u16(), code, message))
}

fn split_endpoint(endpoint: &str) -> (&str, &str) {
    let endpoint = endpoint.trim_end_matches('/');
    if let Some(host) = endpoint.strip_prefix("https://") {
        ("https", host)
    } else if let Some(host) = endpoint.strip_prefix("http://") {
        ("http", host)
    } else {
        ("https", endpoint)
    }
}

/// Percent-encode each path segment of an object key, keeping `/`.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_resource(credential: &UploadCredential, subresource: &str) -> String {
    let mut resource = format!("/{}/{}", credential.bucket, credential.object_key);
    if !subresource.is_empty() {
        resource.push('?');
        resource.push_str(subresource);
    }
    resource
}

fn string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    oss_headers: &[(&str, &str)],
    resource: &str,
) -> String {
    let mut headers: Vec<(String, &str)> = oss_headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), *value))
        .collect();
    headers.sort();
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect();
    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        verb, content_md5, content_type, date, canonical_headers, resource
    )
}

fn sign(secret: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn complete_multipart_xml(parts: &[PartHandle]) -> String {
    let mut xml = String::from("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str(&format!(
            "<Part><PartNumber>{}</PartNumber><ETag>\"{}\"</ETag></Part>",
            part.part_number,
            xml_escape(&part.etag)
        ));
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Text of the first `<tag>` element, if any.
fn xml_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(xml_unescape(&body[start..end]))
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
