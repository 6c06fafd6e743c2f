//! Synchronization pipeline
//!
//! Wires the feed reader, coercer, duplicate handling and sink into one run.
//! One row is fully processed (parsed, coerced, routed, possibly flushed)
//! before the next is pulled; sink I/O is the only suspension point and at
//! most one sink request is in flight per run.

use std::fmt;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::feed::SceneFeed;
use crate::progress::{ProgressReporter, RunCounters};
use crate::record::SceneRecord;
use crate::sink::{SceneSink, SinkMode, WriteOutcome};

/// Observable run states.
///
/// `Flushing` is only entered in bulk mode, for the final partial batch.
/// A fatal error moves the run to `Failed` from any state; no further flush
/// is attempted beyond the write already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    HeaderPending,
    Streaming,
    Flushing,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::HeaderPending => "header_pending",
            RunState::Streaming => "streaming",
            RunState::Flushing => "flushing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: RunState,
    pub counters: RunCounters,
}

impl RunOutcome {
    /// The terminal completion message with final counters.
    pub fn summary(&self) -> String {
        format!("Process is complete! {}", self.counters.status_line())
    }
}

/// One-run orchestrator over a feed file and a sink.
pub struct SyncPipeline<S> {
    sink: S,
    mode: SinkMode,
    reporter: ProgressReporter,
}

impl<S: SceneSink> SyncPipeline<S> {
    pub fn new(sink: S, mode: SinkMode) -> Self {
        Self {
            sink,
            mode,
            reporter: ProgressReporter::stderr(),
        }
    }

    /// Replace the progress reporter (tests use a hidden one).
    pub fn with_reporter(sink: S, mode: SinkMode, reporter: ProgressReporter) -> Self {
        Self {
            sink,
            mode,
            reporter,
        }
    }

    /// Run the pipeline over one feed file.
    ///
    /// Returns the terminal outcome on success; the first fatal error
    /// otherwise. Malformed rows are absorbed and counted, never fatal.
    pub async fn run(&self, source: &Path) -> Result<RunOutcome> {
        let mut counters = RunCounters::default();

        match self.drive(source, &mut counters).await {
            Ok(()) => {
                self.reporter.finish(&counters);
                let outcome = RunOutcome {
                    state: RunState::Done,
                    counters,
                };
                info!(
                    processed = counters.seen,
                    added = counters.inserted,
                    skipped = counters.skipped,
                    malformed = counters.malformed,
                    "Process is complete!"
                );
                Ok(outcome)
            },
            Err(err) => {
                error!(
                    state = RunState::Failed.as_str(),
                    processed = counters.seen,
                    error = %err,
                    "synchronization aborted"
                );
                Err(err)
            },
        }
    }

    async fn drive(&self, source: &Path, counters: &mut RunCounters) -> Result<()> {
        let mut state = RunState::Idle;
        debug!(state = state.as_str(), "run starting");

        state = RunState::HeaderPending;
        debug!(state = state.as_str(), path = %source.display(), "opening feed");
        let mut feed = SceneFeed::open(source).await?;
        let header = feed.header().await?;

        state = RunState::Streaming;
        debug!(state = state.as_str(), fields = header.len(), "header read, streaming rows");

        let mut batch: Vec<SceneRecord> = match self.mode {
            SinkMode::Bulk { batch_size } => Vec::with_capacity(batch_size),
            SinkMode::Single => Vec::new(),
        };

        while let Some(row) = feed.next_row().await? {
            counters.seen += 1;

            let record = match SceneRecord::from_row(&header, &row, feed.line()) {
                Ok(record) => record,
                Err(err) if err.is_row_local() => {
                    counters.malformed += 1;
                    warn!(error = %err, "skipping malformed row");
                    self.reporter.update(counters);
                    continue;
                },
                Err(err) => return Err(err),
            };

            match self.mode {
                SinkMode::Single => {
                    if self.sink.exists(record.scene_id()).await? {
                        counters.skipped += 1;
                    } else {
                        // Not atomic against concurrent writers: a conflict
                        // here is a lost race, classified as skipped.
                        match self.sink.write_one(&record).await? {
                            WriteOutcome::Created => counters.inserted += 1,
                            WriteOutcome::Duplicate => counters.skipped += 1,
                        }
                    }
                },
                SinkMode::Bulk { batch_size } => {
                    batch.push(record);
                    if batch.len() >= batch_size {
                        self.flush(&mut batch, counters).await?;
                    }
                },
            }

            self.reporter.update(counters);
        }

        if !batch.is_empty() {
            state = RunState::Flushing;
            debug!(state = state.as_str(), pending = batch.len(), "flushing final partial batch");
            self.flush(&mut batch, counters).await?;
        }

        Ok(())
    }

    /// Flush the accumulated batch; cleared only on success so a failed
    /// flush propagates without retry.
    async fn flush(&self, batch: &mut Vec<SceneRecord>, counters: &mut RunCounters) -> Result<()> {
        let report = self.sink.write_bulk(batch).await?;

        counters.inserted += report.accepted() as u64;
        counters.skipped += report.conflicts as u64;
        counters.rejected += report.rejected as u64;

        if report.rejected > 0 {
            warn!(
                rejected = report.rejected,
                "sink rejected bulk items for non-duplicate reasons; insert count may undercount"
            );
        }

        batch.clear();
        Ok(())
    }
}

/// Provision the sink target, then run the whole pipeline.
///
/// This is the entry point the CLI uses once the feed file is on disk.
pub async fn synchronize<S: SceneSink>(
    sink: S,
    mode: SinkMode,
    source: &Path,
) -> Result<RunOutcome> {
    sink.ensure_target().await?;
    SyncPipeline::new(sink, mode).run(source).await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_labels() {
        assert_eq!(RunState::HeaderPending.as_str(), "header_pending");
        assert_eq!(RunState::Flushing.as_str(), "flushing");
        assert_eq!(RunState::Done.to_string(), "done");
    }

    #[test]
    fn test_outcome_summary() {
        let outcome = RunOutcome {
            state: RunState::Done,
            counters: RunCounters {
                seen: 3,
                inserted: 2,
                skipped: 1,
                malformed: 0,
                rejected: 0,
            },
        };
        assert_eq!(
            outcome.summary(),
            "Process is complete! processed: 3 added: 2 skipped: 1"
        );
    }
}
