//! Single-URL image download with validation, retry and atomic write
//!
//! A download is one logical fetch: the URL is requested up to `retries + 1`
//! times, each response is checked for an `image/*` content type, and the
//! first valid body is written to a `.part` sibling and renamed into place.
//! Failures never escape as errors; they end up in the returned
//! [`DownloadOutcome`].

use crate::config::Config;
use crate::error::DownloadFailure;
use crate::http::PageClient;
use crate::retry::{BackoffPolicy, retry_with_backoff};
use crate::types::DownloadOutcome;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fetches images and writes them to disk
#[derive(Debug, Clone)]
pub struct Downloader {
    client: PageClient,
    policy: BackoffPolicy,
    retries: u32,
}

impl Downloader {
    /// Create a downloader with an explicit retry budget and backoff policy
    pub fn new(client: PageClient, policy: BackoffPolicy, retries: u32) -> Self {
        Self {
            client,
            policy,
            retries,
        }
    }

    /// Create a downloader using the retry settings from `config`
    pub fn from_config(client: PageClient, config: &Config) -> Self {
        Self::new(client, config.backoff_policy(), config.retries)
    }

    /// Download `url` to `destination`
    ///
    /// The destination's parent directory must already exist.
    pub async fn download(&self, url: &str, destination: &Path) -> DownloadOutcome {
        let outcome = retry_with_backoff(&self.policy, self.retries, || {
            self.attempt(url, destination)
        })
        .await;

        match outcome.result {
            Ok(bytes) => {
                info!(
                    url,
                    path = %destination.display(),
                    bytes,
                    attempts = outcome.attempts,
                    "Downloaded image"
                );
                DownloadOutcome {
                    url: url.to_string(),
                    destination_path: destination.to_path_buf(),
                    success: true,
                    attempts: outcome.attempts,
                    failure_reason: None,
                }
            }
            Err(failure) => {
                warn!(
                    url,
                    path = %destination.display(),
                    attempts = outcome.attempts,
                    reason = %failure,
                    "Download failed"
                );
                DownloadOutcome {
                    url: url.to_string(),
                    destination_path: destination.to_path_buf(),
                    success: false,
                    attempts: outcome.attempts,
                    failure_reason: Some(failure.to_string()),
                }
            }
        }
    }

    async fn attempt(&self, url: &str, destination: &Path) -> Result<usize, DownloadFailure> {
        let response = self.client.get_image(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadFailure::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string());
        if !is_image(content_type.as_deref()) {
            debug!(url, content_type = ?content_type, "Rejected non-image response");
            return Err(DownloadFailure::NonImage { content_type });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DownloadFailure::Body(e.to_string()))?;

        write_atomic(destination, &bytes)
            .await
            .map_err(|e| DownloadFailure::Write {
                path: destination.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(bytes.len())
    }
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Write to a `.part` sibling, then rename over the destination
async fn write_atomic(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(destination);
    let result = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, destination).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        // A short write or failed rename must not leave the partial behind
        tokio::fs::remove_file(&partial).await.ok();
    }
    result
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
