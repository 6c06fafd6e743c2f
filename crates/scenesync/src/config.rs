//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SyncError};
use crate::sink::SinkMode;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default URL of the bulk scene metadata feed.
pub const DEFAULT_FEED_URL: &str =
    "https://landsat.usgs.gov/metadata_service/bulk_metadata_files/LANDSAT_8.csv";

/// Default directory for downloaded feed files.
pub const DEFAULT_DOWNLOAD_DIR: &str = "./download";

/// Default local filename of the feed.
pub const DEFAULT_FEED_FILENAME: &str = "landsat.csv";

/// Default freshness window: skip the download when the on-disk feed is
/// younger than this many hours.
pub const DEFAULT_FRESHNESS_HOURS: u64 = 12;

/// Default HTTP timeout for the feed download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Default retry budget for the feed download.
pub const DEFAULT_DOWNLOAD_MAX_RETRIES: u32 = 3;

/// Default sink base URL (local search index).
pub const DEFAULT_SINK_URL: &str = "http://localhost:9200";

/// Default target index or table.
pub const DEFAULT_TARGET: &str = "landsat";

/// Default records per bulk write (0 selects single-record mode).
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default per-request sink timeout.
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 50;

// ============================================================================
// Configuration Types
// ============================================================================

/// Full configuration for one synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub feed: FeedConfig,
    pub sink: SinkConfig,
}

/// Feed download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed URL
    pub url: String,
    /// Directory the feed is downloaded into
    pub download_dir: PathBuf,
    /// Local filename of the feed
    pub filename: String,
    /// Skip the download when the local copy is younger than this
    pub freshness_hours: u64,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Maximum download attempts
    pub max_retries: u32,
}

/// Sink selection and write settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Which sink implementation to use
    pub kind: SinkKind,
    /// Base URL (search index) or connection string (Postgres)
    pub url: String,
    /// Target index or table
    pub target: String,
    /// Records per bulk write; 0 selects single-record mode
    pub batch_size: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Supported sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Elasticsearch-compatible search index
    Elastic,
    /// Postgres document table
    Postgres,
}

impl std::str::FromStr for SinkKind {
    type Err = SyncError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elastic" | "elasticsearch" | "es" => Ok(SinkKind::Elastic),
            "postgres" | "postgresql" | "pg" => Ok(SinkKind::Postgres),
            other => Err(SyncError::Config(format!(
                "unknown sink kind '{}': expected 'elastic' or 'postgres'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkKind::Elastic => write!(f, "elastic"),
            SinkKind::Postgres => write!(f, "postgres"),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            filename: DEFAULT_FEED_FILENAME.to_string(),
            freshness_hours: DEFAULT_FRESHNESS_HOURS,
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_retries: DEFAULT_DOWNLOAD_MAX_RETRIES,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Elastic,
            url: DEFAULT_SINK_URL.to_string(),
            target: DEFAULT_TARGET.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout_secs: DEFAULT_SINK_TIMEOUT_SECS,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Full path of the local feed file.
    pub fn feed_path(&self) -> PathBuf {
        self.download_dir.join(&self.filename)
    }
}

impl SinkConfig {
    /// Duplicate-handling mode derived from the batch size.
    pub fn mode(&self) -> SinkMode {
        SinkMode::from_batch_size(self.batch_size)
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Environment variables (all optional):
    /// - `SCENESYNC_FEED_URL`, `SCENESYNC_DOWNLOAD_DIR`,
    ///   `SCENESYNC_FRESHNESS_HOURS`, `SCENESYNC_DOWNLOAD_TIMEOUT_SECS`,
    ///   `SCENESYNC_DOWNLOAD_MAX_RETRIES`
    /// - `SCENESYNC_SINK` (elastic | postgres), `SCENESYNC_SINK_URL`,
    ///   `SCENESYNC_TARGET`, `SCENESYNC_BATCH_SIZE`,
    ///   `SCENESYNC_SINK_TIMEOUT_SECS`
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("SCENESYNC_FEED_URL") {
            config.feed.url = url;
        }
        if let Ok(dir) = std::env::var("SCENESYNC_DOWNLOAD_DIR") {
            config.feed.download_dir = PathBuf::from(dir);
        }
        if let Ok(hours) = std::env::var("SCENESYNC_FRESHNESS_HOURS") {
            config.feed.freshness_hours = parse_env("SCENESYNC_FRESHNESS_HOURS", &hours)?;
        }
        if let Ok(secs) = std::env::var("SCENESYNC_DOWNLOAD_TIMEOUT_SECS") {
            config.feed.timeout_secs = parse_env("SCENESYNC_DOWNLOAD_TIMEOUT_SECS", &secs)?;
        }
        if let Ok(retries) = std::env::var("SCENESYNC_DOWNLOAD_MAX_RETRIES") {
            config.feed.max_retries = parse_env("SCENESYNC_DOWNLOAD_MAX_RETRIES", &retries)?;
        }

        if let Ok(kind) = std::env::var("SCENESYNC_SINK") {
            config.sink.kind = kind.parse()?;
        }
        if let Ok(url) = std::env::var("SCENESYNC_SINK_URL") {
            config.sink.url = url;
        }
        if let Ok(target) = std::env::var("SCENESYNC_TARGET") {
            config.sink.target = target;
        }
        if let Ok(batch) = std::env::var("SCENESYNC_BATCH_SIZE") {
            config.sink.batch_size = parse_env("SCENESYNC_BATCH_SIZE", &batch)?;
        }
        if let Ok(secs) = std::env::var("SCENESYNC_SINK_TIMEOUT_SECS") {
            config.sink.timeout_secs = parse_env("SCENESYNC_SINK_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }

    /// Validate the configuration before a run.
    pub fn validate(&self) -> Result<()> {
        if self.feed.url.is_empty() {
            return Err(SyncError::Config("feed URL cannot be empty".to_string()));
        }
        if self.feed.filename.is_empty() {
            return Err(SyncError::Config("feed filename cannot be empty".to_string()));
        }
        if self.feed.max_retries == 0 {
            return Err(SyncError::Config(
                "download retries must be at least 1".to_string(),
            ));
        }
        if self.sink.url.is_empty() {
            return Err(SyncError::Config("sink URL cannot be empty".to_string()));
        }
        if self.sink.target.is_empty() {
            return Err(SyncError::Config(
                "sink target cannot be empty".to_string(),
            ));
        }
        if self.sink.timeout_secs == 0 {
            return Err(SyncError::Config(
                "sink timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| SyncError::Config(format!("invalid value '{}' for {}", value, name)))
}

// ============================================================================
// Tests
// ============================================================================
