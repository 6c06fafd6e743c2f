//! Scenesync - satellite scene metadata synchronization
//!
//! Streams a bulk scene metadata feed (CSV, one row per scene) into a
//! downstream store, inserting only records not already present. Memory is
//! bounded by strict pull-based row handling: one row is parsed, coerced and
//! written (or batched) before the next one is read.
//!
//! # Example
//!
//! ```no_run
//! use scenesync::{synchronize, ElasticSink, SinkMode};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sink = ElasticSink::new("http://localhost:9200", "landsat", 50)?;
//!     let outcome = synchronize(
//!         sink,
//!         SinkMode::Bulk { batch_size: 500 },
//!         Path::new("./download/landsat.csv"),
//!     )
//!     .await?;
//!     println!("{}", outcome.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod sink;

pub use config::{FeedConfig, SinkConfig, SinkKind, SyncConfig};
pub use download::FeedDownloader;
pub use error::{Result, SyncError};
pub use feed::SceneFeed;
pub use pipeline::{synchronize, RunOutcome, RunState, SyncPipeline};
pub use progress::{ProgressReporter, RunCounters};
pub use record::SceneRecord;
pub use sink::{BulkReport, ElasticSink, PostgresSink, SceneSink, SinkMode, WriteOutcome};
