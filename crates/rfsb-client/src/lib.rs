//! rfsb-client: Client library for the rfsb remote file browser.
//!
//! Provides:
//! - CLI argument parsing
//! - Browse and fetch requests over any transport
//! - Reassembly of fetched files with digest verification

pub mod cli;
pub mod client;
pub mod reassembler;
pub mod sink;

pub use cli::{Cli, CliLogFormat, Command, FetchArgs};
pub use client::Client;
pub use reassembler::{ClientReassembler, FetchReport, FileReport, FileStatus};
pub use sink::FileSink;
