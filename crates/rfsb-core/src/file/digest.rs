//! Whole-file content digest.
//!
//! MD5 (128-bit), rendered as lowercase hex. Both sides feed file bytes in
//! part order and compare the textual form.

use md5::{Digest, Md5};

/// Running digest over a file's bytes.
#[derive(Clone, Default)]
pub struct FileDigest {
    hasher: Md5,
    len: u64,
}

impl FileDigest {
    /// Start an empty digest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next slice of the file.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.len += data.len() as u64;
    }

    /// Number of bytes fed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if no bytes were fed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish and return the hex digest.
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl std::fmt::Debug for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDigest").field("len", &self.len).finish()
    }
}

/// Hex digest of a complete buffer.
pub fn digest_hex(data: &[u8]) -> String {
    let mut digest = FileDigest::new();
    digest.update(data);
    digest.finalize()
}
