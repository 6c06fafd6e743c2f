//! scenesync - scene metadata synchronization tool

use anyhow::Result;
use clap::{Parser, Subcommand};
use scenesync::{
    synchronize, ElasticSink, FeedDownloader, PostgresSink, SinkKind, SyncConfig,
};
use scenesync_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "scenesync")]
#[command(author, version, about = "Satellite scene metadata synchronizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the feed (unless fresh) and synchronize it into the sink
    Sync {
        /// Path to an already-downloaded feed file (skips the download step)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Sink kind: elastic or postgres
        #[arg(long)]
        sink: Option<String>,

        /// Sink base URL (search index) or connection string (Postgres)
        #[arg(long)]
        sink_url: Option<String>,

        /// Target index or table
        #[arg(long)]
        target: Option<String>,

        /// Records per bulk write; 0 selects single-record mode
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Download the feed without synchronizing
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env()?;
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    let mut config = SyncConfig::load()?;

    match cli.command {
        Command::Sync {
            source,
            sink,
            sink_url,
            target,
            batch_size,
        } => {
            if let Some(kind) = sink {
                config.sink.kind = kind.parse()?;
            }
            if let Some(url) = sink_url {
                config.sink.url = url;
            }
            if let Some(target) = target {
                config.sink.target = target;
            }
            if let Some(batch_size) = batch_size {
                config.sink.batch_size = batch_size;
            }
            config.validate()?;

            let feed_path = match source {
                Some(path) => path,
                None => FeedDownloader::new(config.feed.clone())?.fetch().await?,
            };

            let outcome = match config.sink.kind {
                SinkKind::Elastic => {
                    let sink = ElasticSink::new(
                        &config.sink.url,
                        &config.sink.target,
                        config.sink.timeout_secs,
                    )?;
                    synchronize(sink, config.sink.mode(), &feed_path).await?
                },
                SinkKind::Postgres => {
                    let sink = PostgresSink::connect(&config.sink.url, &config.sink.target).await?;
                    synchronize(sink, config.sink.mode(), &feed_path).await?
                },
            };

            info!("{}", outcome.summary());
        },
        Command::Download => {
            config.validate()?;
            let path = FeedDownloader::new(config.feed.clone())?.fetch().await?;
            info!(path = %path.display(), "feed downloaded");
        },
    }

    Ok(())
}
