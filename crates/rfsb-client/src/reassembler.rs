//! Client-side reassembly of fetched files.
//!
//! Chunks of different files may interleave, but each file's parts arrive
//! in order. The reassembler keeps one pending entry per file name, writes
//! payloads as they arrive and verifies the digest on the final part.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use rfsb_core::error::{Error, Result};
use rfsb_core::file::resolve_under;
use rfsb_core::protocol::{Chunk, FetchSummary};

use crate::sink::FileSink;

/// Final state of one received file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Written in full and the digests match.
    Verified,
    /// Written in full but the content differs.
    DigestMismatch { expected: String, computed: String },
    /// The number of bytes received differs from the announced size.
    SizeMismatch { expected: u64, received: u64 },
    /// The file could not be written locally.
    Failed { error: String },
    /// The stream ended before the final part arrived.
    Incomplete { received: u64, parts: u64 },
}

impl FileStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, FileStatus::Verified)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Verified => write!(f, "verified"),
            FileStatus::DigestMismatch { expected, computed } => {
                write!(f, "digest mismatch (expected {}, computed {})", expected, computed)
            }
            FileStatus::SizeMismatch { expected, received } => {
                write!(f, "size mismatch (expected {} bytes, received {})", expected, received)
            }
            FileStatus::Failed { error } => write!(f, "failed: {}", error),
            FileStatus::Incomplete { received, parts } => {
                write!(f, "incomplete ({} of {} parts)", received, parts)
            }
        }
    }
}

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Name as sent by the server.
    pub name: String,
    /// Local destination, if the name was usable.
    pub path: Option<PathBuf>,
    /// Bytes written locally.
    pub bytes: u64,
    pub status: FileStatus,
}

/// Everything a fetch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Per-file results in completion order.
    pub files: Vec<FileReport>,
    /// Totals from the server's end-of-stream marker.
    pub summary: Option<FetchSummary>,
}

impl FetchReport {
    /// Returns true if every file verified.
    pub fn all_verified(&self) -> bool {
        self.files.iter().all(|f| f.status.is_verified())
    }

    pub fn verified_count(&self) -> usize {
        self.files.iter().filter(|f| f.status.is_verified()).count()
    }

    /// Files that did not verify.
    pub fn problems(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.status.is_verified())
    }

    pub fn file(&self, name: &str) -> Option<&FileReport> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// A file whose final part has not arrived yet.
struct PendingFile {
    path: Option<PathBuf>,
    /// `None` once writing failed; remaining parts are discarded.
    sink: Option<FileSink>,
    error: Option<String>,
    size: u64,
    parts: u64,
    next_part: u64,
    written: u64,
}

impl PendingFile {
    fn fail(&mut self, error: String) {
        self.sink = None;
        self.error.get_or_insert(error);
    }
}

/// Writes fetched chunks under a local root and verifies each file.
pub struct ClientReassembler {
    root: PathBuf,
    pending: HashMap<String, PendingFile>,
    report: FetchReport,
}

impl ClientReassembler {
    /// Reassemble files under `root`, which must be absolute and normalized.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pending: HashMap::new(),
            report: FetchReport::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files started but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Consume one chunk.
    ///
    /// Returns the file's report when this was its final part. Local write
    /// problems are recorded in the report; only malformed chunk sequences
    /// are returned as errors.
    pub async fn accept(&mut self, chunk: Chunk) -> Result<Option<FileReport>> {
        if chunk.part == 0 || chunk.part > chunk.parts {
            return Err(protocol_error(format!(
                "{}: part {} out of range 1..={}",
                chunk.name, chunk.part, chunk.parts
            )));
        }

        if !self.pending.contains_key(&chunk.name) {
            if chunk.part != 1 {
                return Err(protocol_error(format!(
                    "{}: first chunk is part {}",
                    chunk.name, chunk.part
                )));
            }
            let entry = self.open(&chunk).await;
            self.pending.insert(chunk.name.clone(), entry);
        }

        let Some(entry) = self.pending.get_mut(&chunk.name) else {
            return Err(protocol_error(format!("{}: no pending entry", chunk.name)));
        };
        if chunk.part != entry.next_part || chunk.parts != entry.parts || chunk.size != entry.size {
            return Err(protocol_error(format!(
                "{}: got part {}/{} (size {}), expected part {}/{} (size {})",
                chunk.name,
                chunk.part,
                chunk.parts,
                chunk.size,
                entry.next_part,
                entry.parts,
                entry.size
            )));
        }

        trace!(name = %chunk.name, part = chunk.part, parts = chunk.parts, len = chunk.data.len(), "Chunk received");
        entry.next_part += 1;
        if let Some(sink) = entry.sink.as_mut() {
            match sink.write(&chunk.data).await {
                Ok(()) => entry.written += chunk.data.len() as u64,
                Err(e) => {
                    warn!(name = %chunk.name, error = %e, "Write failed, discarding remaining parts");
                    entry.fail(e.to_string());
                }
            }
        }

        if !chunk.is_last() {
            return Ok(None);
        }

        let Some(expected) = chunk.digest else {
            return Err(protocol_error(format!("{}: final part carries no digest", chunk.name)));
        };
        let Some(entry) = self.pending.remove(&chunk.name) else {
            return Err(protocol_error(format!("{}: no pending entry", chunk.name)));
        };
        let report = finalize(chunk.name, entry, expected).await;
        self.report.files.push(report.clone());
        Ok(Some(report))
    }

    /// Close the fetch, turning still-pending files into `Incomplete`.
    pub fn finish(mut self, summary: Option<FetchSummary>) -> FetchReport {
        let mut leftovers: Vec<_> = self.pending.drain().collect();
        leftovers.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, entry) in leftovers {
            warn!(name = %name, received = entry.next_part - 1, parts = entry.parts, "File incomplete at end of stream");
            self.report.files.push(FileReport {
                name,
                path: entry.path,
                bytes: entry.written,
                status: FileStatus::Incomplete {
                    received: entry.next_part - 1,
                    parts: entry.parts,
                },
            });
        }
        self.report.summary = summary;
        self.report
    }

    /// Start a pending entry for the first part of a file.
    async fn open(&self, chunk: &Chunk) -> PendingFile {
        let mut entry = PendingFile {
            path: None,
            sink: None,
            error: None,
            size: chunk.size,
            parts: chunk.parts,
            next_part: 1,
            written: 0,
        };

        let path = match local_path(&self.root, &chunk.name) {
            Ok(path) => path,
            Err(e) => {
                warn!(name = %chunk.name, error = %e, "Refusing to write outside the destination");
                entry.fail(e.to_string());
                return entry;
            }
        };
        match FileSink::create(&path).await {
            Ok(sink) => {
                debug!(name = %chunk.name, path = %path.display(), parts = chunk.parts, "Receiving file");
                entry.sink = Some(sink);
            }
            Err(e) => {
                warn!(name = %chunk.name, error = %e, "Cannot create local file");
                entry.fail(e.to_string());
            }
        }
        entry.path = Some(path);
        entry
    }
}

/// Map a server-side name onto the local root.
fn local_path(root: &Path, name: &str) -> Result<PathBuf> {
    if name.is_empty() || Path::new(name).is_absolute() {
        return Err(Error::InvalidPath {
            path: name.to_string(),
        });
    }
    let path = resolve_under(root, name)?;
    if path == root {
        return Err(Error::InvalidPath {
            path: name.to_string(),
        });
    }
    Ok(path)
}

async fn finalize(name: String, entry: PendingFile, expected: String) -> FileReport {
    let PendingFile {
        path,
        sink,
        error,
        size,
        written,
        ..
    } = entry;

    let (bytes, status) = match (sink, error) {
        (Some(sink), _) => match sink.finish().await {
            Ok((len, _)) if len != size => (
                len,
                FileStatus::SizeMismatch {
                    expected: size,
                    received: len,
                },
            ),
            Ok((len, computed)) if computed != expected => {
                (len, FileStatus::DigestMismatch { expected, computed })
            }
            Ok((len, _)) => (len, FileStatus::Verified),
            Err(e) => (written, FileStatus::Failed { error: e.to_string() }),
        },
        (None, Some(error)) => (written, FileStatus::Failed { error }),
        (None, None) => (
            written,
            FileStatus::Failed {
                error: "no local destination".to_string(),
            },
        ),
    };

    match &status {
        FileStatus::Verified => info!(name = %name, bytes, "File verified"),
        FileStatus::DigestMismatch { expected, computed } => {
            warn!(name = %name, expected = %expected, computed = %computed, "Digest mismatch")
        }
        other => warn!(name = %name, status = %other, "File not verified"),
    }

    FileReport {
        name,
        path,
        bytes,
        status,
    }
}

fn protocol_error(message: String) -> Error {
    Error::Protocol { message }
}
