//! Single-level directory listing.

use std::io::ErrorKind;
use std::path::Path;

use rfsb_core::error::{Error, Result};

/// Direct children of one directory, split by type and sorted by name.
///
/// Entries are classified without following symlinks, so a link to a
/// directory is listed as a file and never descended into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
    /// Entries whose names are not valid UTF-8, in lossy form.
    ///
    /// These cannot be named on the wire, so they are neither listed nor
    /// fetched.
    pub invalid: Vec<String>,
}

/// List the directory at `path`; `name` is used in errors.
pub async fn list_dir(path: &Path, name: &str) -> Result<DirListing> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound {
            path: name.to_string(),
        },
        _ => Error::Read {
            path: name.to_string(),
            message: e.to_string(),
        },
    })?;
    if !metadata.is_dir() {
        return Err(Error::NotADirectory {
            path: name.to_string(),
        });
    }

    let read_error = |e: std::io::Error| Error::Read {
        path: name.to_string(),
        message: format!("failed to list contents: {}", e),
    };

    let mut listing = DirListing::default();
    let mut entries = tokio::fs::read_dir(path).await.map_err(read_error)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let file_name = match entry.file_name().into_string() {
            Ok(file_name) => file_name,
            Err(raw) => {
                listing.invalid.push(raw.to_string_lossy().into_owned());
                continue;
            }
        };
        if entry.file_type().await.map_err(read_error)?.is_dir() {
            listing.dirs.push(file_name);
        } else {
            listing.files.push(file_name);
        }
    }

    listing.dirs.sort();
    listing.files.sort();
    listing.invalid.sort();
    Ok(listing)
}
