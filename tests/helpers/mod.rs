//! In-memory open API and object store used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use video_upload::errors::{StoreError, StoreResult, UploadError, UploadResult};
use video_upload::models::{Params, PartHandle, SessionId, UploadCredential};
use video_upload::services::credential_provider::{CREATE_ACTION, REFRESH_ACTION};
use video_upload::services::video_registrar::{COMPLETE_ACTION, SAVE_ACTION};
use video_upload::traits::{ApiTransport, ObjectStore, UrlMethod};
use video_upload::{ClientOrigin, UploadSettings};

pub const VID: &str = "XNDk2MTk0NTY4MA==";
pub const UPLOAD_TOKEN: &str = "ut-1";

/// Settings with no pauses between attempts.
pub fn fast_settings() -> UploadSettings {
    UploadSettings {
        retry_delay: Duration::ZERO,
        client_origin: ClientOrigin::Fixed("10.0.0.1".into()),
        ..Default::default()
    }
}

pub fn issued_credential() -> UploadCredential {
    UploadCredential {
        endpoint: "oss-cn-beijing.aliyuncs.com".into(),
        bucket: "vendor-bucket".into(),
        object_key: "uploads/clip.mp4".into(),
        access_id: "id-0".into(),
        access_secret: "secret-0".into(),
        security_token: "sts-0".into(),
        expiry: "1700000000".into(),
        upload_token: UPLOAD_TOKEN.into(),
        vid: VID.into(),
    }
}

/// Scripted answer for one open API call.
pub enum Reply {
    Body(String),
    Fail(String),
}

impl Reply {
    pub fn vendor_error(code: i64, message: &str) -> Self {
        Reply::Body(
            serde_json::json!({"e": {"code": code, "desc": message}, "cost": 0.01})
                .to_string(),
        )
    }

    pub fn empty_data() -> Self {
        Reply::Body(r#"{"e":{"code":0},"data":[]}"#.into())
    }
}

fn data_body<T: serde::Serialize>(entry: &T) -> String {
    serde_json::json!({"e": {"code": 0, "provider": "oupload"}, "cost": 0.02, "data": [entry]})
        .to_string()
}

/// Open API fake. Unscripted calls succeed with plausible data; refreshes
/// hand out `id-1`, `id-2` and so on.
pub struct FakeApi {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, Params)>>,
    refreshes: Mutex<u32>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            refreshes: Mutex::new(0),
        })
    }

    /// Queue `reply` for the next call of `action`.
    pub fn script(&self, action: &str, reply: Reply) {
        self.scripts
            .lock()
            .unwrap()
            .entry(action.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self, action: &str) -> usize {
        self.params(action).len()
    }

    pub fn params(&self, action: &str) -> Vec<Params> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == action)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn default_reply(&self, action: &str, params: &Params) -> String {
        match action {
            CREATE_ACTION => data_body(&issued_credential()),
            REFRESH_ACTION => {
                let mut n = self.refreshes.lock().unwrap();
                *n += 1;
                data_body(&UploadCredential {
                    access_id: format!("id-{}", n),
                    access_secret: format!("secret-{}", n),
                    security_token: format!("sts-{}", n),
                    ..issued_credential()
                })
            }
            SAVE_ACTION | COMPLETE_ACTION => data_body(&serde_json::json!({
                "vid": VID,
                "upload_token": params.get("upload_token").cloned().unwrap_or_default(),
            })),
            _ => r#"{"e":{"code":-1,"desc":"unknown action"}}"#.into(),
        }
    }
}

#[async_trait]
impl ApiTransport for FakeApi {
    async fn get(&self, action: &str, params: Params) -> UploadResult<Bytes> {
        self.post(action, params).await
    }

    async fn post(&self, action: &str, params: Params) -> UploadResult<Bytes> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), params.clone()));

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(action)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(Reply::Fail(message)) => Err(UploadError::Transport(message)),
            Some(Reply::Body(body)) => Ok(Bytes::from(body)),
            None => Ok(Bytes::from(self.default_reply(action, &params))),
        }
    }
}

/// Scripted failure for one part attempt.
#[derive(Clone, Copy, Debug)]
pub enum PartFailure {
    Auth,
    Transient,
    /// The store could not read the part locally.
    Local,
}

#[derive(Default)]
struct StoreState {
    part_failures: HashMap<u32, VecDeque<PartFailure>>,
    failing_part: Option<u32>,
    fail_complete: bool,
    fail_abort: bool,
    upload_delay: Duration,
    cancel_after_part: Option<(u32, CancellationToken)>,

    signed_urls: Vec<(String, UrlMethod)>,
    single_puts: Vec<(String, Bytes)>,
    sessions: u32,
    session_buckets: Vec<String>,
    attempts: HashMap<u32, u32>,
    parts: BTreeMap<u32, Bytes>,
    part_access_ids: Vec<(u32, String)>,
    part_buckets: Vec<(u32, String)>,
    completed: Vec<Vec<PartHandle>>,
    aborted: u32,
}

/// Object store fake keeping everything in memory.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next attempts of `part` in order.
    pub fn fail_part(&self, part: u32, failures: &[PartFailure]) {
        self.state
            .lock()
            .unwrap()
            .part_failures
            .entry(part)
            .or_default()
            .extend(failures.iter().copied());
    }

    /// Every attempt of `part` fails transiently.
    pub fn always_fail_part(&self, part: u32) {
        self.state.lock().unwrap().failing_part = Some(part);
    }

    pub fn fail_complete(&self) {
        self.state.lock().unwrap().fail_complete = true;
    }

    pub fn fail_abort(&self) {
        self.state.lock().unwrap().fail_abort = true;
    }

    /// Delay every part upload and single-request upload.
    pub fn delay_uploads(&self, delay: Duration) {
        self.state.lock().unwrap().upload_delay = delay;
    }

    /// Cancel `token` once `part` has been stored.
    pub fn cancel_after_part(&self, part: u32, token: CancellationToken) {
        self.state.lock().unwrap().cancel_after_part = Some((part, token));
    }

    pub fn sessions(&self) -> u32 {
        self.state.lock().unwrap().sessions
    }

    pub fn aborted(&self) -> u32 {
        self.state.lock().unwrap().aborted
    }

    pub fn completed(&self) -> Vec<Vec<PartHandle>> {
        self.state.lock().unwrap().completed.clone()
    }

    pub fn attempts(&self, part: u32) -> u32 {
        self.state
            .lock()
            .unwrap()
            .attempts
            .get(&part)
            .copied()
            .unwrap_or(0)
    }

    pub fn part_sizes(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .parts
            .values()
            .map(|b| b.len())
            .collect()
    }

    /// Stored parts concatenated in part order.
    pub fn assembled(&self) -> Bytes {
        let state = self.state.lock().unwrap();
        let mut out = BytesMut::new();
        for part in state.parts.values() {
            out.extend_from_slice(part);
        }
        out.freeze()
    }

    /// Access id used by each successful part upload.
    pub fn part_access_ids(&self) -> Vec<(u32, String)> {
        self.state.lock().unwrap().part_access_ids.clone()
    }

    /// Bucket each multipart session was opened in.
    pub fn session_buckets(&self) -> Vec<String> {
        self.state.lock().unwrap().session_buckets.clone()
    }

    /// Bucket addressed by each successful part upload.
    pub fn part_buckets(&self) -> Vec<(u32, String)> {
        self.state.lock().unwrap().part_buckets.clone()
    }

    /// `(bucket, body)` of each single-request upload.
    pub fn single_puts(&self) -> Vec<(String, Bytes)> {
        self.state.lock().unwrap().single_puts.clone()
    }

    pub fn signed_urls(&self) -> Vec<(String, UrlMethod)> {
        self.state.lock().unwrap().signed_urls.clone()
    }
}

fn url_for(credential: &UploadCredential) -> String {
    format!(
        "https://{}.{}/{}?OSSAccessKeyId={}",
        credential.bucket, credential.endpoint, credential.object_key, credential.access_id
    )
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn sign_url(
        &self,
        credential: &UploadCredential,
        method: UrlMethod,
        _expires_in: Duration,
    ) -> StoreResult<String> {
        let url = url_for(credential);
        self.state
            .lock()
            .unwrap()
            .signed_urls
            .push((url.clone(), method));
        Ok(url)
    }

    async fn put_object_via_url(
        &self,
        credential: &UploadCredential,
        _url: &str,
        body: Bytes,
    ) -> StoreResult<()> {
        let delay = self.state.lock().unwrap().upload_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state
            .lock()
            .unwrap()
            .single_puts
            .push((credential.bucket.clone(), body));
        Ok(())
    }

    async fn put_object_from_file_via_url(
        &self,
        credential: &UploadCredential,
        url: &str,
        path: &Path,
    ) -> StoreResult<()> {
        let body = tokio::fs::read(path).await?;
        self.put_object_via_url(credential, url, Bytes::from(body))
            .await
    }

    async fn initiate_multipart(&self, credential: &UploadCredential) -> StoreResult<SessionId> {
        let mut state = self.state.lock().unwrap();
        state.sessions += 1;
        state.session_buckets.push(credential.bucket.clone());
        Ok(SessionId {
            object_key: credential.object_key.clone(),
            upload_id: format!("upload-{}", state.sessions),
        })
    }

    async fn upload_part(
        &self,
        credential: &UploadCredential,
        _session: &SessionId,
        part_number: u32,
        body: Bytes,
    ) -> StoreResult<PartHandle> {
        let delay = self.state.lock().unwrap().upload_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        *state.attempts.entry(part_number).or_default() += 1;

        if state.failing_part == Some(part_number) {
            return Err(StoreError::Transport("connection reset".into()));
        }
        let scripted = state
            .part_failures
            .get_mut(&part_number)
            .and_then(|queue| queue.pop_front());
        match scripted {
            Some(PartFailure::Auth) => {
                return Err(StoreError::from_code(
                    403,
                    "SecurityTokenExpired",
                    "The security token you provided has expired.",
                ));
            }
            Some(PartFailure::Transient) => {
                return Err(StoreError::from_code(503, "ServiceUnavailable", "busy"));
            }
            Some(PartFailure::Local) => {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "part body truncated",
                )));
            }
            None => {}
        }

        let etag = format!("\"{:x}\"", md5::compute(&body));
        state.parts.insert(part_number, body);
        state
            .part_access_ids
            .push((part_number, credential.access_id.clone()));
        state
            .part_buckets
            .push((part_number, credential.bucket.clone()));
        if let Some((part, token)) = &state.cancel_after_part {
            if *part == part_number {
                token.cancel();
            }
        }
        Ok(PartHandle { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        _credential: &UploadCredential,
        _session: &SessionId,
        parts: &[PartHandle],
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_complete {
            return Err(StoreError::from_code(400, "InvalidPart", "part mismatch"));
        }
        state.completed.push(parts.to_vec());
        Ok(())
    }

    async fn abort_multipart(
        &self,
        _credential: &UploadCredential,
        _session: &SessionId,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.aborted += 1;
        if state.fail_abort {
            return Err(StoreError::Transport("abort timed out".into()));
        }
        Ok(())
    }
}

/// Deterministic payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Write `content` to a fresh temp file.
pub fn temp_file(content: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}
