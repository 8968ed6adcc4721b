//! Fixed-size chunked reading of one file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::digest::FileDigest;
use crate::error::{Error, Result};
use crate::protocol::Chunk;

/// Number of chunks a file of `size` bytes is split into.
///
/// Empty files still produce one (empty) chunk so the size and digest
/// reach the client.
pub fn chunk_count(size: u64, chunk_size: usize) -> u64 {
    debug_assert!(chunk_size > 0, "chunk size must be positive");
    if size == 0 {
        1
    } else {
        size.div_ceil(chunk_size as u64)
    }
}

/// Lazily reads one file as a finite sequence of [`Chunk`]s.
///
/// The part count is fixed from the size observed at open time. A running
/// digest covers every byte emitted and is attached to the final chunk.
/// After the last chunk or the first error, `next_chunk` returns `Ok(None)`.
pub struct ChunkReader {
    name: String,
    path: PathBuf,
    file: File,
    size: u64,
    chunk_size: usize,
    parts: u64,
    next_part: u64,
    offset: u64,
    digest: FileDigest,
}

impl ChunkReader {
    /// Open `path` for chunked reading; chunks are tagged with `name`.
    pub async fn open(path: &Path, name: impl Into<String>, chunk_size: usize) -> Result<Self> {
        let name = name.into();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| open_error(&name, e))?;
        if !metadata.is_file() {
            return Err(Error::NotAFile { path: name });
        }

        let file = File::open(path).await.map_err(|e| open_error(&name, e))?;
        let size = metadata.len();

        Ok(Self {
            parts: chunk_count(size, chunk_size),
            name,
            path: path.to_path_buf(),
            file,
            size,
            chunk_size,
            next_part: 1,
            offset: 0,
            digest: FileDigest::new(),
        })
    }

    /// Name carried on every chunk.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size observed at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Total number of chunks this reader yields.
    pub fn parts(&self) -> u64 {
        self.parts
    }

    /// Returns true once every chunk has been produced or reading failed.
    pub fn is_finished(&self) -> bool {
        self.next_part > self.parts
    }

    /// Read the next chunk.
    ///
    /// Fails with [`Error::Read`] if the file cannot supply the bytes its
    /// size promised; the reader is finished afterwards.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.is_finished() {
            return Ok(None);
        }

        let remaining = self.size - self.offset;
        let len = remaining.min(self.chunk_size as u64) as usize;
        let mut data = vec![0u8; len];

        if let Err(e) = self.file.read_exact(&mut data).await {
            let failed_part = self.next_part;
            self.next_part = self.parts + 1;
            return Err(Error::Read {
                path: self.name.clone(),
                message: format!(
                    "part {} of {} at offset {}: {}",
                    failed_part, self.parts, self.offset, e
                ),
            });
        }

        self.digest.update(&data);
        let part = self.next_part;
        self.next_part += 1;
        self.offset += len as u64;

        let digest = if part == self.parts {
            Some(std::mem::take(&mut self.digest).finalize())
        } else {
            None
        };

        Ok(Some(Chunk {
            name: self.name.clone(),
            size: self.size,
            data,
            part,
            parts: self.parts,
            digest,
        }))
    }
}

fn open_error(name: &str, e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::NotFound => Error::NotFound {
            path: name.to_string(),
        },
        _ => Error::Read {
            path: name.to_string(),
            message: e.to_string(),
        },
    }
}
