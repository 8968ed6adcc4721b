//! File support shared by client and server.
//!
//! This module provides:
//! - Chunked file reading with a running digest
//! - The whole-file digest used for verification
//! - Root-relative path resolution

pub mod chunk;
pub mod digest;
pub mod path;

pub use chunk::{ChunkReader, chunk_count};
pub use digest::{FileDigest, digest_hex};
pub use path::{confine, normalize, relative_name, resolve_under};
