//! Browse requests: list one directory under the root.

use std::path::PathBuf;

use tracing::debug;

use rfsb_core::error::Result;
use rfsb_core::file::{relative_name, resolve_under};
use rfsb_core::protocol::{BrowseRequest, BrowseResponse};

use crate::listing::list_dir;

/// Answers browse requests against a root directory.
#[derive(Debug, Clone)]
pub struct Browser {
    root: PathBuf,
}

impl Browser {
    /// Create a browser. `root` must be absolute and normalized.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// List the direct children of the requested directory.
    pub async fn browse(&self, request: &BrowseRequest) -> Result<BrowseResponse> {
        let path = resolve_under(&self.root, &request.dir)?;
        let name = relative_name(&self.root, &path).unwrap_or_else(|_| request.dir.clone());
        let listing = list_dir(&path, &request.dir).await?;
        debug!(
            dir = %name,
            dirs = listing.dirs.len(),
            files = listing.files.len(),
            "Browsed directory"
        );
        Ok(BrowseResponse {
            dirs: listing.dirs,
            files: listing.files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfsb_core::error::Error;
    use rfsb_test_utils::TestTree;

    fn request(dir: &str) -> BrowseRequest {
        BrowseRequest {
            dir: dir.to_string(),
        }
    }

    #[tokio::test]
    async fn browse_root_and_subdir() {
        let tree = TestTree::new();
        tree.file("notes.txt", b"n")
            .file("docs/a.md", b"a")
            .dir("docs/img");
        let browser = Browser::new(tree.path());

        let root = browser.browse(&request("")).await.unwrap();
        assert_eq!(root.dirs, vec!["docs"]);
        assert_eq!(root.files, vec!["notes.txt"]);

        let docs = browser.browse(&request("docs")).await.unwrap();
        assert_eq!(docs.dirs, vec!["img"]);
        assert_eq!(docs.files, vec!["a.md"]);
    }

    #[tokio::test]
    async fn browse_errors() {
        let tree = TestTree::new();
        tree.file("f.txt", b"x");
        let browser = Browser::new(tree.path());

        assert!(matches!(
            browser.browse(&request("missing")).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            browser.browse(&request("f.txt")).await,
            Err(Error::NotADirectory { .. })
        ));
        assert!(matches!(
            browser.browse(&request("../..")).await,
            Err(Error::InvalidPath { .. })
        ));
    }
}
