//! rfsb-server: Server library for the rfsb remote file browser.
//!
//! Provides:
//! - Browse handling (single directory listings)
//! - The fetch pipeline (expansion, producers, completion tracking)
//! - Per-connection sessions and the TCP listener

pub mod browse;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod listener;
pub mod listing;
pub mod session;

pub use browse::Browser;
pub use cli::{Cli, CliLogFormat};
pub use config::{ServerConfig, resolve_root};
pub use fetch::{FetchCoordinator, FetchOutcome};
pub use listener::Server;
pub use session::{Session, SessionStats};
