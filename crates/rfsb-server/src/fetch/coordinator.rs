//! Fetch coordinator: fan-in of producer chunks onto the transport.
//!
//! The coordinator is the single owner of the chunk receiver. It forwards
//! chunks until the completion tracker reports [`Phase::Done`], then closes
//! the channel once, drains what is buffered and sends the end-of-stream
//! marker.
//!
//! [`Phase::Done`]: super::tracker::Phase::Done

use std::path::PathBuf;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rfsb_core::config::FetchConfig;
use rfsb_core::error::Result;
use rfsb_core::protocol::{Chunk, FetchRequest, FetchSummary, Message};
use rfsb_core::transport::StreamPair;

use super::expander::DirectoryExpander;
use super::report::{ExpansionReport, FetchOutcome, format_bytes};
use super::tracker::CompletionTracker;

/// Runs fetch requests against one root directory.
#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    root: PathBuf,
    config: FetchConfig,
}

impl FetchCoordinator {
    /// Create a coordinator. `root` must be absolute and normalized.
    pub fn new(root: impl Into<PathBuf>, config: FetchConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Root directory requests are resolved against.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Stream every file named by `request` onto `stream`.
    ///
    /// Per-file problems are logged and reported in the returned outcome.
    /// Only transport errors are returned; they cancel all producers.
    pub async fn run<S: StreamPair>(
        &self,
        request: FetchRequest,
        stream: &mut S,
    ) -> Result<FetchOutcome> {
        let start = Instant::now();
        info!(
            dirs = request.dirs.len(),
            files = request.files.len(),
            "Fetch started"
        );

        let (sink, mut rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let cancel = CancellationToken::new();
        let (tracker, root_guard) = CompletionTracker::new();

        let expander = DirectoryExpander::new(self.root.clone(), &self.config, sink, cancel.clone());
        let expansion = tokio::spawn(expander.run(request, root_guard));

        let mut summary = FetchSummary::default();
        let streamed = pump(stream, &mut rx, &tracker, &mut summary).await;

        if streamed.is_err() {
            cancel.cancel();
        }
        drop(rx);

        let report = match expansion.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Directory expansion task failed");
                ExpansionReport::default()
            }
        };

        if let Err(e) = streamed {
            warn!(
                error = %e,
                chunks = summary.chunks,
                files = summary.files,
                "Fetch aborted"
            );
            return Err(e);
        }

        stream.send(&Message::FetchEnd(summary)).await?;

        let elapsed = start.elapsed();
        info!(
            "Transferred {} chunks, {} files, total size {} in {:?}",
            summary.chunks,
            summary.files,
            format_bytes(summary.bytes),
            elapsed
        );
        if !report.skipped.is_empty() || !report.failed.is_empty() {
            info!(
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Some requested items were not transferred"
            );
        }

        Ok(FetchOutcome {
            summary,
            report,
            elapsed,
        })
    }
}

/// Forward chunks until the tracker is done, then close and drain.
async fn pump<S: StreamPair>(
    stream: &mut S,
    rx: &mut mpsc::Receiver<Chunk>,
    tracker: &CompletionTracker,
    summary: &mut FetchSummary,
) -> Result<()> {
    let done = tracker.wait_done();
    tokio::pin!(done);

    loop {
        tokio::select! {
            biased;
            Some(chunk) = rx.recv() => forward(stream, chunk, summary).await?,
            _ = &mut done => break,
        }
    }

    // Every producer has finished, so what is buffered is all that is left.
    rx.close();
    while let Some(chunk) = rx.recv().await {
        forward(stream, chunk, summary).await?;
    }
    debug!(chunks = summary.chunks, "Chunk channel drained");
    Ok(())
}

async fn forward<S: StreamPair>(
    stream: &mut S,
    chunk: Chunk,
    summary: &mut FetchSummary,
) -> Result<()> {
    let len = chunk.data.len() as u64;
    let last = chunk.is_last();
    stream.send(&Message::Chunk(chunk)).await?;

    summary.chunks += 1;
    summary.bytes += len;
    if last {
        summary.files += 1;
    }
    Ok(())
}
