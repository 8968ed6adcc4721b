//! rfsb-core: Shared library for the rfsb remote file browser.
//!
//! This crate provides:
//! - Protocol message definitions and wire format codec
//! - Transport abstraction and TCP transport
//! - Chunked file reading and digests
//! - Fetch configuration
//! - Logging setup

pub mod config;
pub mod constants;
pub mod error;
pub mod file;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use config::FetchConfig;
pub use error::{Error, Result};
pub use logging::{LogFormat, init_logging};
