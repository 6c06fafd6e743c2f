//! Run counters and live progress reporting
//!
//! Counters are plain values owned by the run; nothing here is global or
//! shared across runs. The reporter is advisory output only: it must never
//! block, fail, or feed back into pipeline control flow.

use indicatif::{ProgressBar, ProgressStyle};

/// Counters for one synchronization run.
///
/// Monotonically non-decreasing for the duration of a run. In bulk mode
/// `inserted` counts records the sink accepted into a bulk write minus
/// reported key conflicts; the sink may undercount true inserts when a bulk
/// item fails for other reasons (tracked in `rejected`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Data rows pulled from the feed (header excluded)
    pub seen: u64,
    /// Rows written to the sink (attempted, in bulk mode)
    pub inserted: u64,
    /// Rows skipped as already present
    pub skipped: u64,
    /// Rows dropped as malformed
    pub malformed: u64,
    /// Bulk items the sink rejected for non-duplicate reasons
    pub rejected: u64,
}

impl RunCounters {
    /// The interim status line surfaced while streaming.
    pub fn status_line(&self) -> String {
        format!(
            "processed: {} added: {} skipped: {}",
            self.seen, self.inserted, self.skipped
        )
    }
}

/// Fire-and-forget status line for a run.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Reporter that renders a spinner with the running counters.
    pub fn stderr() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self { bar }
    }

    /// Reporter that renders nothing; used by tests and quiet runs.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Refresh the status line. Never blocks.
    pub fn update(&self, counters: &RunCounters) {
        self.bar.set_message(counters.status_line());
        self.bar.tick();
    }

    /// Freeze the final counters on screen.
    pub fn finish(&self, counters: &RunCounters) {
        self.bar.finish_with_message(counters.status_line());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_format() {
        let counters = RunCounters {
            seen: 12,
            inserted: 9,
            skipped: 2,
            malformed: 1,
            rejected: 0,
        };
        assert_eq!(counters.status_line(), "processed: 12 added: 9 skipped: 2");
    }

    #[test]
    fn test_counters_start_at_zero() {
        let counters = RunCounters::default();
        assert_eq!(counters, RunCounters::default());
        assert_eq!(counters.status_line(), "processed: 0 added: 0 skipped: 0");
    }

    #[test]
    fn test_hidden_reporter_is_silent() {
        let reporter = ProgressReporter::hidden();
        reporter.update(&RunCounters::default());
        reporter.finish(&RunCounters::default());
    }
}
