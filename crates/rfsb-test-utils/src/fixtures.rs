//! Temporary directory trees for fetch tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory populated with files and directories.
///
/// The directory and everything in it is removed on drop.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Root of the tree.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a root-relative name.
    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write a file, creating parent directories.
    pub fn file(&self, rel: &str, content: &[u8]) -> &Self {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, content).expect("failed to write test file");
        self
    }

    /// Create a directory (and parents).
    pub fn dir(&self, rel: &str) -> &Self {
        std::fs::create_dir_all(self.join(rel)).expect("failed to create test dir");
        self
    }

    /// Read a file back.
    pub fn read(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.join(rel)).expect("failed to read test file")
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic non-repeating-looking content of `len` bytes.
pub fn patterned_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u64).wrapping_mul(31).wrapping_add(seed as u64) % 251) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_files() {
        let tree = TestTree::new();
        tree.file("d/sub/f.txt", b"nested").dir("empty_dir");

        assert_eq!(tree.read("d/sub/f.txt"), b"nested");
        assert!(tree.join("empty_dir").is_dir());
    }

    #[test]
    fn patterned_bytes_are_deterministic() {
        assert_eq!(patterned_bytes(100, 7), patterned_bytes(100, 7));
        assert_ne!(patterned_bytes(100, 7), patterned_bytes(100, 8));
        assert_eq!(patterned_bytes(0, 1).len(), 0);
    }
}
