//! Per-file chunk producer.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use rfsb_core::file::{ChunkReader, confine};
use rfsb_core::protocol::Chunk;

use super::report::{FileOutcome, SkipReason};
use super::tracker::FileTicket;

/// A file found by the expander, ready to be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    /// Root-relative name carried on every chunk.
    pub name: String,
    /// Absolute local path.
    pub path: PathBuf,
}

/// State shared by every producer of one fetch.
#[derive(Clone)]
pub struct ProducerContext {
    /// Canonical served root. Files whose real path leaves it are skipped.
    pub root: Arc<PathBuf>,
    pub chunk_size: usize,
    /// Shared output channel. Producers only send; the coordinator owns the receiver.
    pub sink: mpsc::Sender<Chunk>,
    pub cancel: CancellationToken,
    /// Bounds the number of files open at once.
    pub open_files: Arc<Semaphore>,
}

/// Streams one file onto the shared channel.
pub struct FileProducer {
    job: FileJob,
    ticket: FileTicket,
    ctx: ProducerContext,
}

impl FileProducer {
    pub fn new(job: FileJob, ticket: FileTicket, ctx: ProducerContext) -> Self {
        Self { job, ticket, ctx }
    }

    /// Stream every chunk of the file, then finish its ticket.
    ///
    /// The ticket is finished exactly once on every path: success, skip,
    /// read failure or cancellation.
    pub async fn run(self) -> (String, FileOutcome) {
        let FileProducer { job, ticket, ctx } = self;

        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => FileOutcome::Cancelled,
            outcome = stream_file(&job, &ctx) => outcome,
        };

        match &outcome {
            FileOutcome::Streamed { chunks, bytes } => {
                debug!(name = %job.name, chunks, bytes, "File streamed");
            }
            FileOutcome::Skipped(SkipReason::NotFound) => {
                warn!(name = %job.name, "File not found, skipping");
            }
            FileOutcome::Skipped(reason) => {
                warn!(name = %job.name, ?reason, "Skipping file");
            }
            FileOutcome::Failed { chunks, message } => {
                warn!(name = %job.name, chunks, error = %message, "File read failed, remaining chunks dropped");
            }
            FileOutcome::Cancelled => {
                debug!(name = %job.name, "File streaming cancelled");
            }
        }

        ticket.finish();
        (job.name, outcome)
    }
}

async fn stream_file(job: &FileJob, ctx: &ProducerContext) -> FileOutcome {
    let Ok(_permit) = ctx.open_files.acquire().await else {
        return FileOutcome::Cancelled;
    };

    let opened = match confine(&ctx.root, &job.path, &job.name).await {
        Ok(real) => ChunkReader::open(&real, job.name.clone(), ctx.chunk_size).await,
        Err(e) => Err(e),
    };
    let mut reader = match opened {
        Ok(reader) => reader,
        Err(e) => {
            return match SkipReason::from_error(&e) {
                Some(reason) => FileOutcome::Skipped(reason),
                None => FileOutcome::Failed {
                    chunks: 0,
                    message: e.to_string(),
                },
            };
        }
    };

    let mut chunks = 0u64;
    let mut bytes = 0u64;
    loop {
        match reader.next_chunk().await {
            Ok(Some(chunk)) => {
                let len = chunk.data.len() as u64;
                trace!(name = %chunk.name, part = chunk.part, parts = chunk.parts, len, "Chunk read");
                if ctx.sink.send(chunk).await.is_err() {
                    // Receiver closed: the fetch was torn down.
                    return FileOutcome::Cancelled;
                }
                chunks += 1;
                bytes += len;
            }
            Ok(None) => return FileOutcome::Streamed { chunks, bytes },
            Err(e) => {
                return FileOutcome::Failed {
                    chunks,
                    message: e.to_string(),
                };
            }
        }
    }
}
