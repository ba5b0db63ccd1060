use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use video_upload::{OpenApiClient, OssStore, UploadClient, config::AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + upload job ---
    let (cfg, job) = AppConfig::from_env_and_args()?;

    tracing::info!(
        api_url = %cfg.api_url,
        client_id = %cfg.client_id,
        file = %job.file.display(),
        chunked = job.chunked,
        "Starting video upload"
    );

    // --- Build transport + object store ---
    let mut api = OpenApiClient::new(
        cfg.api_url.clone(),
        cfg.client_id.clone(),
        cfg.client_secret.clone(),
        cfg.request_timeout,
    )
    .context("building open API client")?;
    if let Some(token) = &cfg.access_token {
        api = api.with_access_token(token.clone());
    } else {
        tracing::warn!("No access token configured; upload actions will likely be rejected");
    }
    let store = OssStore::new(cfg.request_timeout).context("building object store client")?;

    let client = UploadClient::new(Arc::new(api), Arc::new(store), cfg.upload.clone());

    // --- Ctrl-C cancels between parts ---
    let cancel = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling upload");
            cancel.cancel();
        }
    });

    // --- Upload ---
    let uploader = client
        .upload_file(job.file.clone())
        .await
        .with_context(|| format!("preparing {}", job.file.display()))?;
    tracing::info!(
        bytes = uploader.request().size_bytes,
        md5 = %uploader.request().checksum,
        "File hashed"
    );

    let video = if job.register {
        uploader.upload_and_register(&job.metadata, job.chunked).await
    } else {
        uploader.upload(job.chunked, None).await
    }
    .context("upload failed")?;

    tracing::info!(vid = %video.vid, "Upload finished");
    println!("{}", serde_json::to_string_pretty(&video)?);

    Ok(())
}
