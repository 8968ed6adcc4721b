//! Request, response and chunk messages.

use serde::{Deserialize, Serialize};

// =============================================================================
// Top-level Message Enum
// =============================================================================

/// Top-level protocol message type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// List the direct children of a directory.
    BrowseRequest(BrowseRequest),
    /// Reply to a browse request.
    BrowseResponse(BrowseResponse),
    /// Stream files and directory trees to the client.
    FetchRequest(FetchRequest),
    /// One chunk of a fetched file.
    Chunk(Chunk),
    /// End of a fetch stream.
    FetchEnd(FetchSummary),
    /// Request-level failure.
    Error(ErrorPayload),
}

impl Message {
    /// Short name of the message kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::BrowseRequest(_) => "BrowseRequest",
            Message::BrowseResponse(_) => "BrowseResponse",
            Message::FetchRequest(_) => "FetchRequest",
            Message::Chunk(_) => "Chunk",
            Message::FetchEnd(_) => "FetchEnd",
            Message::Error(_) => "Error",
        }
    }
}

// =============================================================================
// Browse
// =============================================================================

/// Browse request for one directory, relative to the server root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseRequest {
    pub dir: String,
}

/// Direct children of a browsed directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseResponse {
    /// Subdirectory names.
    pub dirs: Vec<String>,
    /// Non-directory entry names.
    pub files: Vec<String>,
}

// =============================================================================
// Fetch
// =============================================================================

/// Fetch request. Paths are relative to the server root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Directories to stream recursively.
    pub dirs: Vec<String>,
    /// Individual files to stream.
    pub files: Vec<String>,
}

impl FetchRequest {
    /// Create a request from directory and file paths.
    pub fn new<D, F>(dirs: D, files: F) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the request names nothing.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// One slice of a file plus its sequence metadata.
///
/// For a given `name`, parts run 1..=parts in order and only the final part
/// carries the digest of the whole file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Path relative to the server root, `/`-separated.
    pub name: String,
    /// Total file length in bytes.
    pub size: u64,
    /// Payload bytes of this part.
    pub data: Vec<u8>,
    /// 1-based part number.
    pub part: u64,
    /// Total number of parts for this file.
    pub parts: u64,
    /// Hex digest of the whole file, only on the final part.
    pub digest: Option<String>,
}

impl Chunk {
    /// Returns true if this is the final part of its file.
    pub fn is_last(&self) -> bool {
        self.part == self.parts
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("len", &self.data.len())
            .field("part", &self.part)
            .field("parts", &self.parts)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Totals for a finished fetch stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSummary {
    /// Files whose final chunk was sent.
    pub files: u64,
    /// Chunks sent.
    pub chunks: u64,
    /// Payload bytes sent.
    pub bytes: u64,
}

/// Request-level error reported to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_request_empty() {
        assert!(FetchRequest::default().is_empty());
        assert!(!FetchRequest::new(Vec::<String>::new(), ["a.txt"]).is_empty());
        assert!(!FetchRequest::new(["docs"], Vec::<String>::new()).is_empty());
    }

    #[test]
    fn chunk_is_last() {
        let mut chunk = Chunk {
            name: "a.txt".into(),
            size: 3,
            data: b"abc".to_vec(),
            part: 1,
            parts: 2,
            digest: None,
        };
        assert!(!chunk.is_last());
        chunk.part = 2;
        assert!(chunk.is_last());
    }

    #[test]
    fn chunk_debug_omits_payload() {
        let chunk = Chunk {
            name: "big.bin".into(),
            size: 4,
            data: vec![0xAA; 4],
            part: 1,
            parts: 1,
            digest: Some("00".into()),
        };
        let debug = format!("{:?}", chunk);
        assert!(debug.contains("len: 4"));
        assert!(!debug.contains("170"));
    }
}
