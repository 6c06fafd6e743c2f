//! Pull-based scene feed reader
//!
//! Wraps an async CSV reader over the downloaded feed file. The contract is
//! strictly pull: the caller must fully handle one row before requesting the
//! next, which is what bounds memory for arbitrarily large feeds. There is no
//! pause/resume machinery; backpressure falls out of `next_row().await`.

use std::path::Path;

use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use tokio::fs::File;

use crate::error::{Result, SyncError};

/// Line-oriented reader over one feed file.
///
/// The reader is `flexible`: rows with the wrong field count are yielded
/// rather than rejected here, so the coercer can classify them as malformed
/// and the run can continue.
pub struct SceneFeed {
    reader: AsyncReader<File>,
    line: u64,
}

impl SceneFeed {
    /// Open a feed file for streaming.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).await?;
        let reader = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .create_reader(file);

        Ok(Self { reader, line: 0 })
    }

    /// Read the header line (ordered field names).
    ///
    /// Must be called before the first `next_row`; the header row is never
    /// handed to the row handler.
    pub async fn header(&mut self) -> Result<Vec<String>> {
        match self.next_row().await? {
            Some(row) => Ok(row.iter().map(str::to_string).collect()),
            None => Err(SyncError::Parse("feed contains no header line".to_string())),
        }
    }

    /// Pull the next row, `None` at end of feed.
    pub async fn next_row(&mut self) -> Result<Option<StringRecord>> {
        let mut row = StringRecord::new();
        if self.reader.read_record(&mut row).await? {
            self.line += 1;
            Ok(Some(row))
        } else {
            Ok(None)
        }
    }

    /// 1-based number of the most recently read line (the header is line 1).
    pub fn line(&self) -> u64 {
        self.line
    }
}

// ============================================================================
// Tests
// ============================================================================
