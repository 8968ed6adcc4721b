//! Lexical path handling relative to a root directory.
//!
//! Request paths and chunk names are `/`-separated and relative to a root.
//! Everything except [`confine`] is lexical, so paths that do not exist yet
//! can still be validated.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Normalize a path by removing `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) | Component::Normal(_) => {
                normalized.push(comp.as_os_str());
            }
        }
    }

    normalized
}

/// Resolve `path` against `root`, rejecting anything that leaves it.
///
/// Absolute paths are accepted when they already point inside `root`.
/// `root` is expected to be normalized.
pub fn resolve_under(root: &Path, path: &str) -> Result<PathBuf> {
    let input = Path::new(path);
    let resolved = if input.is_absolute() {
        normalize(input)
    } else {
        normalize(&root.join(relative_components(input)?))
    };

    if !resolved.starts_with(root) {
        return Err(Error::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(resolved)
}

/// Reject `..` segments that would climb above the start of a relative path.
fn relative_components(input: &Path) -> Result<PathBuf> {
    let mut depth = 0usize;
    for comp in input.components() {
        match comp {
            Component::ParentDir if depth == 0 => {
                return Err(Error::InvalidPath {
                    path: input.display().to_string(),
                });
            }
            Component::ParentDir => depth -= 1,
            Component::Normal(_) => depth += 1,
            _ => {}
        }
    }
    Ok(input.to_path_buf())
}

/// Resolve symlinks in `path` and check the target is still under `root`.
///
/// `root` must already be canonical. `name` is used in errors.
pub async fn confine(root: &Path, path: &Path, name: &str) -> Result<PathBuf> {
    let real = tokio::fs::canonicalize(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound {
            path: name.to_string(),
        },
        _ => Error::Read {
            path: name.to_string(),
            message: e.to_string(),
        },
    })?;

    if !real.starts_with(root) {
        return Err(Error::InvalidPath {
            path: name.to_string(),
        });
    }
    Ok(real)
}

/// The `/`-separated name of `path` relative to `root`.
pub fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| Error::InvalidPath {
        path: path.display().to_string(),
    })?;

    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
