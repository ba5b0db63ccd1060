use crate::models::multipart::DEFAULT_PART_SIZE;
use crate::models::VideoMetadata;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Default open API router endpoint.
pub const DEFAULT_API_URL: &str = "https://openapi.youku.com/router/rest.json";

/// Maximum attempts for one part before the upload is abandoned.
pub const DEFAULT_PART_ATTEMPTS: u32 = 15;

/// Maximum attempts for the completion confirmation.
pub const DEFAULT_CONFIRM_ATTEMPTS: u32 = 5;

/// How the synthetic client origin sent with the upload-create request is chosen.
///
/// The vendor expects a `client_ip` attribute; its value has no effect on
/// authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClientOrigin {
    /// A fresh pseudo-random IPv4 address per request.
    #[default]
    Random,
    /// Always send this value.
    Fixed(String),
    /// Do not send the attribute at all.
    Omit,
}

/// Knobs for the upload pipeline itself.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub part_size: u64,
    pub part_attempts: u32,
    pub confirm_attempts: u32,
    /// Pause between failed attempts.
    pub retry_delay: Duration,
    /// Overall limit for one `upload` call, if any.
    pub deadline: Option<Duration>,
    /// Once the deadline passes, how long an in-flight part may take to
    /// settle (and the session to be aborted) before the upload is dropped.
    pub cancel_grace: Duration,
    /// Lifetime of signed PUT URLs for single-part uploads.
    pub sign_url_ttl: Duration,
    pub client_origin: ClientOrigin,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            part_attempts: DEFAULT_PART_ATTEMPTS,
            confirm_attempts: DEFAULT_CONFIRM_ATTEMPTS,
            retry_delay: Duration::from_millis(500),
            deadline: None,
            cancel_grace: Duration::from_secs(30),
            sign_url_ttl: Duration::from_secs(3600),
            client_origin: ClientOrigin::Random,
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub request_timeout: Duration,
    pub upload: UploadSettings,
}

/// What the binary was asked to upload.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub file: PathBuf,
    pub metadata: VideoMetadata,
    pub chunked: bool,
    pub register: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Upload a video file to the open platform")]
pub struct Args {
    /// Video file to upload
    pub file: PathBuf,

    /// Video title (defaults to the file name)
    #[arg(long)]
    pub title: Option<String>,

    /// Comma-separated tags
    #[arg(long, default_value = "")]
    pub tags: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Category name
    #[arg(long)]
    pub category: Option<String>,

    /// Upload with a single PUT instead of 5 MiB parts
    #[arg(long)]
    pub single_part: bool,

    /// Upload only; skip save and completion
    #[arg(long)]
    pub upload_only: bool,

    /// Open API endpoint (overrides VIDEO_UPLOAD_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Client id (overrides VIDEO_UPLOAD_CLIENT_ID)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Access token (overrides VIDEO_UPLOAD_ACCESS_TOKEN)
    #[arg(long)]
    pub access_token: Option<String>,

    /// Fixed client_ip to report (overrides VIDEO_UPLOAD_CLIENT_IP)
    #[arg(long)]
    pub client_ip: Option<String>,

    /// Abort the upload after this many seconds (overrides VIDEO_UPLOAD_DEADLINE_SECS)
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the upload job.
    pub fn from_env_and_args() -> Result<(Self, UploadJob)> {
        let args = Args::parse();
        Self::resolve(args, |name| env::var(name).ok())
    }

    /// Merge CLI args over values looked up by `lookup` (normally the process env).
    pub fn resolve(
        args: Args,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, UploadJob)> {
        // --- Environment fallback ---
        let env_api_url = lookup("VIDEO_UPLOAD_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into());
        let env_client_id = lookup("VIDEO_UPLOAD_CLIENT_ID");
        let client_secret = lookup("VIDEO_UPLOAD_CLIENT_SECRET")
            .context("Missing client secret. Set VIDEO_UPLOAD_CLIENT_SECRET")?;
        let env_token = lookup("VIDEO_UPLOAD_ACCESS_TOKEN");
        let env_client_ip = lookup("VIDEO_UPLOAD_CLIENT_IP");
        let timeout_secs: u64 = parse_var(&lookup, "VIDEO_UPLOAD_TIMEOUT_SECS", 60)?;
        let env_deadline: Option<u64> = match lookup("VIDEO_UPLOAD_DEADLINE_SECS") {
            Some(value) => Some(
                value
                    .parse()
                    .with_context(|| format!("parsing VIDEO_UPLOAD_DEADLINE_SECS value `{}`", value))?,
            ),
            None => None,
        };
        let retry_delay_ms: u64 = parse_var(&lookup, "VIDEO_UPLOAD_RETRY_DELAY_MS", 500)?;

        // --- Merge ---
        let client_id = match args.client_id.or(env_client_id) {
            Some(id) if !id.is_empty() => id,
            _ => bail!("Missing client id. Set VIDEO_UPLOAD_CLIENT_ID or pass --client-id"),
        };
        let client_origin = match args.client_ip.or(env_client_ip) {
            Some(ip) if ip.eq_ignore_ascii_case("none") => ClientOrigin::Omit,
            Some(ip) => ClientOrigin::Fixed(ip),
            None => ClientOrigin::Random,
        };

        let upload = UploadSettings {
            retry_delay: Duration::from_millis(retry_delay_ms),
            deadline: args.deadline_secs.or(env_deadline).map(Duration::from_secs),
            client_origin,
            ..UploadSettings::default()
        };

        let cfg = Self {
            api_url: args.api_url.unwrap_or(env_api_url),
            client_id,
            client_secret,
            access_token: args.access_token.or(env_token).filter(|t| !t.is_empty()),
            request_timeout: Duration::from_secs(timeout_secs),
            upload,
        };

        let title = args.title.unwrap_or_else(|| {
            args.file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let job = UploadJob {
            metadata: VideoMetadata {
                description: args.description,
                category_name: args.category,
                ..VideoMetadata::new(title, args.tags)
            },
            file: args.file,
            chunked: !args.single_part,
            register: !args.upload_only,
        };

        Ok((cfg, job))
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}
