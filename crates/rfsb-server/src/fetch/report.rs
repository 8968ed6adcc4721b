//! Per-file outcomes and fetch totals.

use std::time::Duration;

use rfsb_core::error::Error;
use rfsb_core::protocol::FetchSummary;

/// Why a requested or discovered item produced no chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    NotAFile,
    NotADirectory,
    InvalidPath,
    /// Already taken by an earlier item of the same request.
    Duplicate,
}

impl SkipReason {
    /// Classify a per-item error; `None` for errors that are not skips.
    pub fn from_error(error: &Error) -> Option<Self> {
        match error {
            Error::NotFound { .. } => Some(SkipReason::NotFound),
            Error::NotAFile { .. } => Some(SkipReason::NotAFile),
            Error::NotADirectory { .. } => Some(SkipReason::NotADirectory),
            Error::InvalidPath { .. } => Some(SkipReason::InvalidPath),
            _ => None,
        }
    }
}

/// How one file producer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Every chunk was handed to the output channel.
    Streamed { chunks: u64, bytes: u64 },
    /// Nothing was emitted.
    Skipped(SkipReason),
    /// Reading failed; `chunks` were emitted before the failure.
    Failed { chunks: u64, message: String },
    /// The fetch was aborted while this file was streaming.
    Cancelled,
}

/// A request item or discovered entry that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub name: String,
    pub reason: SkipReason,
}

/// A file or directory that failed part way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub name: String,
    pub message: String,
}

/// Everything the directory expander observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Files whose chunks were all emitted.
    pub streamed: u64,
    pub skipped: Vec<SkippedItem>,
    pub failed: Vec<FailedItem>,
    /// Files abandoned because the fetch was cancelled.
    pub cancelled: u64,
}

impl ExpansionReport {
    /// Record the end of one file producer.
    pub fn record(&mut self, name: String, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Streamed { .. } => self.streamed += 1,
            FileOutcome::Skipped(reason) => self.skipped.push(SkippedItem { name, reason }),
            FileOutcome::Failed { message, .. } => self.failed.push(FailedItem { name, message }),
            FileOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Record an item that failed before any producer ran.
    pub fn record_error(&mut self, name: String, error: &Error) {
        match SkipReason::from_error(error) {
            Some(reason) => self.skipped.push(SkippedItem { name, reason }),
            None => self.failed.push(FailedItem {
                name,
                message: error.to_string(),
            }),
        }
    }
}

/// Result of one completed fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Totals sent in the end-of-stream marker.
    pub summary: FetchSummary,
    pub report: ExpansionReport,
    pub elapsed: Duration,
}

/// Format bytes in human-readable form.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_reason_from_error() {
        let err = Error::NotFound {
            path: "missing.txt".into(),
        };
        assert_eq!(SkipReason::from_error(&err), Some(SkipReason::NotFound));
        assert_eq!(SkipReason::from_error(&Error::ConnectionClosed), None);
    }

    #[test]
    fn report_records_outcomes() {
        let mut report = ExpansionReport::default();
        report.record("a".into(), FileOutcome::Streamed { chunks: 2, bytes: 10 });
        report.record("b".into(), FileOutcome::Skipped(SkipReason::NotAFile));
        report.record(
            "c".into(),
            FileOutcome::Failed {
                chunks: 1,
                message: "eof".into(),
            },
        );
        report.record("d".into(), FileOutcome::Cancelled);
        report.record_error(
            "e".into(),
            &Error::Read {
                path: "e".into(),
                message: "denied".into(),
            },
        );

        assert_eq!(report.streamed, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(
            report.skipped,
            vec![SkippedItem {
                name: "b".into(),
                reason: SkipReason::NotAFile
            }]
        );
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[1].name, "e");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(150_000), "146.48 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
