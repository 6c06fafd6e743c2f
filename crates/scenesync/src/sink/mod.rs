//! Sink capability interface
//!
//! One trait covers both downstream stores (search index, document table).
//! The conflict-handling mode is declared up front via [`SinkMode`], selected
//! from configuration: `batch_size == 0` means single-record mode with an
//! explicit existence check per record, anything else means bulk mode relying
//! on the sink's create-unless-exists semantics.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::SceneRecord;

pub mod elastic;
pub mod postgres;

pub use elastic::ElasticSink;
pub use postgres::PostgresSink;

/// Outcome of a single-record write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Record was created in the sink
    Created,
    /// Sink already holds a record with this identity key
    Duplicate,
}

/// Per-attempt accounting for one bulk write.
///
/// Key conflicts inside an otherwise-successful bulk never abort the write;
/// items rejected for any other reason are counted here and logged by the
/// sink, not escalated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Records handed to the sink in this bulk write
    pub attempted: usize,
    /// Items the sink reported as duplicate-key conflicts
    pub conflicts: usize,
    /// Items the sink rejected for non-duplicate reasons
    pub rejected: usize,
}

impl BulkReport {
    /// Items the sink accepted (attempted minus conflicts and rejections).
    pub fn accepted(&self) -> usize {
        self.attempted - self.conflicts - self.rejected
    }
}

/// Duplicate-handling mode for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// Check-then-write one record at a time
    Single,
    /// Accumulate records and flush whole batches
    Bulk { batch_size: usize },
}

impl SinkMode {
    /// Derive the mode from the configured batch size (0 = single-record).
    pub fn from_batch_size(batch_size: usize) -> Self {
        if batch_size == 0 {
            SinkMode::Single
        } else {
            SinkMode::Bulk { batch_size }
        }
    }
}

/// Downstream store receiving scene records.
///
/// Implementations issue at most one request per call; the pipeline never
/// has more than one sink request in flight per run.
#[async_trait]
pub trait SceneSink {
    /// Idempotently create the target index/table before the first write.
    async fn ensure_target(&self) -> Result<()>;

    /// Whether a record with this identity key is already present.
    /// Used only in single-record mode.
    async fn exists(&self, scene_id: &str) -> Result<bool>;

    /// Write one record, mapping a sink-side uniqueness conflict to
    /// [`WriteOutcome::Duplicate`] rather than an error. The check-then-write
    /// sequence in the pipeline is not atomic against concurrent writers, so
    /// a conflict after a "not found" read is an expected outcome.
    async fn write_one(&self, record: &SceneRecord) -> Result<WriteOutcome>;

    /// Write a whole batch. Individual key conflicts must not abort the bulk.
    async fn write_bulk(&self, records: &[SceneRecord]) -> Result<BulkReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_batch_size() {
        assert_eq!(SinkMode::from_batch_size(0), SinkMode::Single);
        assert_eq!(
            SinkMode::from_batch_size(200),
            SinkMode::Bulk { batch_size: 200 }
        );
    }

    #[test]
    fn test_bulk_report_accepted() {
        let report = BulkReport {
            attempted: 10,
            conflicts: 3,
            rejected: 1,
        };
        assert_eq!(report.accepted(), 6);
        assert_eq!(BulkReport::default().accepted(), 0);
    }
}
