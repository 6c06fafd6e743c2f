//! Feed downloader
//!
//! Streams the metadata feed to disk with a progress bar, skipping the
//! download entirely when the local copy is younger than the configured
//! freshness window. Transient failures retry with exponential backoff; a
//! partial download is written to a `.part` file and renamed only on
//! success, so it can never satisfy the freshness check.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::FeedConfig;
use crate::error::{Result, SyncError};

const DOWNLOAD_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// HTTP downloader for the scene metadata feed.
pub struct FeedDownloader {
    client: Client,
    config: FeedConfig,
}

impl FeedDownloader {
    /// Create a downloader with the given feed configuration.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("scenesync/0.1")
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Ensure a sufficiently fresh feed file exists locally, downloading it
    /// when needed. Returns the path of the feed file.
    pub async fn fetch(&self) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.download_dir).await?;

        let dest = self.config.feed_path();
        if self.is_fresh(&dest).await? {
            info!(
                path = %dest.display(),
                freshness_hours = self.config.freshness_hours,
                "feed was downloaded within the freshness window, skipping download"
            );
            return Ok(dest);
        }

        self.download_with_retry(&dest).await?;
        Ok(dest)
    }

    /// Whether the local feed file exists and is younger than the freshness
    /// window.
    async fn is_fresh(&self, dest: &Path) -> Result<bool> {
        let metadata = match tokio::fs::metadata(dest).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        let modified = metadata.modified()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();

        Ok(age < Duration::from_secs(self.config.freshness_hours * 3600))
    }

    /// Download with exponential backoff (2^attempt seconds between tries).
    async fn download_with_retry(&self, dest: &Path) -> Result<()> {
        let mut last_error = None;

        for attempt in 1..=self.config.max_retries {
            match self.download(dest).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %err,
                        "feed download attempt failed"
                    );
                    last_error = Some(err);

                    if attempt < self.config.max_retries {
                        let backoff_secs = 2u64.pow(attempt);
                        info!(backoff_secs, "retrying download");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SyncError::Download(format!(
                "download failed after {} attempts",
                self.config.max_retries
            ))
        }))
    }

    /// Single download attempt, streamed to `<dest>.part` then renamed.
    async fn download(&self, dest: &Path) -> Result<()> {
        info!(url = %self.config.url, "downloading scene metadata feed");

        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| SyncError::Download(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SyncError::Download(format!(
                "feed request returned {}",
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let bar = if total > 0 {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(DOWNLOAD_BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::new_spinner()
        };

        let part = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SyncError::Download(e.to_string()))?;
            file.write_all(&chunk).await?;
            bar.inc(chunk.len() as u64);
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&part, dest).await?;

        bar.finish_and_clear();
        info!(path = %dest.display(), "download completed");
        Ok(())
    }
}
