//! Local destination for one received file.

use std::path::{Path, PathBuf};

use tokio::fs::{DirBuilder, File, OpenOptions};
use tokio::io::AsyncWriteExt;

use rfsb_core::constants::{DIR_MODE, FILE_MODE};
use rfsb_core::error::{Error, Result};
use rfsb_core::file::FileDigest;

/// An open output file plus the running digest of what was written.
pub struct FileSink {
    path: PathBuf,
    file: File,
    digest: FileDigest,
}

impl FileSink {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            let mut builder = DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            builder.mode(DIR_MODE);
            builder
                .create(parent)
                .await
                .map_err(|e| write_error(parent, "failed to create directory", e))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);
        let file = options
            .open(path)
            .await
            .map_err(|e| write_error(path, "failed to create file", e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            digest: FileDigest::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.digest.len()
    }

    /// Append `data` and feed it to the digest.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .await
            .map_err(|e| write_error(&self.path, "write failed", e))?;
        self.digest.update(data);
        Ok(())
    }

    /// Flush and close the file, returning its length and hex digest.
    pub async fn finish(mut self) -> Result<(u64, String)> {
        self.file
            .flush()
            .await
            .map_err(|e| write_error(&self.path, "flush failed", e))?;
        let len = self.digest.len();
        Ok((len, self.digest.finalize()))
    }
}

fn write_error(path: &Path, what: &str, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("{} {}: {}", what, path.display(), e),
    ))
}
