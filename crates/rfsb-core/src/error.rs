//! Error types for rfsb-core.

use thiserror::Error;

/// Main error type for rfsb operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol violation or unexpected message.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Codec error during encoding/decoding.
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Connection was closed by the peer.
    #[error("connection closed")]
    ConnectionClosed,

    /// Transport layer error.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Requested path does not exist under the root.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// Requested path exists but is not a regular file.
    #[error("not a file: {path}")]
    NotAFile { path: String },

    /// Requested path exists but is not a directory.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// Path escapes the root directory or is otherwise unusable.
    #[error("invalid path: {path}")]
    InvalidPath { path: String },

    /// Filesystem read failed part way through a file.
    #[error("failed to read '{path}': {message}")]
    Read { path: String, message: String },

    /// Request-level failure reported by the peer.
    #[error("remote error: {message}")]
    Remote { message: String },

    /// Invalid configuration value.
    #[error("invalid config: {message}")]
    Config { message: String },
}

impl Error {
    /// Returns true if this error aborts the whole request.
    ///
    /// Transport-level failures are the only errors that cross the fetch
    /// coordinator boundary; per-file errors are absorbed by the producer.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. }
                | Error::ConnectionClosed
                | Error::Codec { .. }
                | Error::Protocol { .. }
        )
    }

    /// Returns true if this error only affects a single file.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::NotAFile { .. }
                | Error::NotADirectory { .. }
                | Error::InvalidPath { .. }
                | Error::Read { .. }
        )
    }
}

/// Convenience result type for rfsb operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_protocol() {
        let err = Error::Protocol {
            message: "unexpected message".into(),
        };
        assert_eq!(err.to_string(), "protocol error: unexpected message");
    }

    #[test]
    fn error_display_read() {
        let err = Error::Read {
            path: "a.txt".into(),
            message: "early eof".into(),
        };
        assert_eq!(err.to_string(), "failed to read 'a.txt': early eof");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn fatal_errors() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::Transport {
            message: "reset".into()
        }
        .is_fatal());

        // Per-file failures never abort the fetch
        assert!(!Error::NotFound {
            path: "missing.txt".into()
        }
        .is_fatal());
        assert!(!Error::Read {
            path: "a".into(),
            message: "eof".into()
        }
        .is_fatal());
    }

    #[test]
    fn per_file_errors() {
        assert!(Error::NotFound { path: "x".into() }.is_per_file());
        assert!(Error::InvalidPath { path: "../x".into() }.is_per_file());
        assert!(!Error::ConnectionClosed.is_per_file());
    }
}
