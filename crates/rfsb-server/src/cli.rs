//! Server CLI implementation.
//!
//! Provides command-line argument parsing for the rfsb server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use rfsb_core::config::FetchConfig;
use rfsb_core::constants::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_DIR_LISTINGS, DEFAULT_MAX_OPEN_FILES,
    DEFAULT_PORT,
};
use rfsb_core::error::{Error, Result};

use crate::config::ServerConfig;

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for rfsb_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => rfsb_core::LogFormat::Text,
            CliLogFormat::Json => rfsb_core::LogFormat::Json,
        }
    }
}

/// rfsb server - browse and fetch files under a root directory.
#[derive(Debug, Parser)]
#[command(
    name = "rfsb-server",
    version,
    about = "rfsb server - browse and fetch files under a root directory"
)]
pub struct Cli {
    /// Address to listen on
    #[arg(short = 'b', long = "bind", default_value = "0.0.0.0")]
    pub bind_addr: IpAddr,

    /// Port to listen on
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory to serve (default: home directory)
    #[arg(short = 'r', long = "root", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Chunk payload size in bytes
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE, value_name = "BYTES")]
    pub chunk_size: usize,

    /// Maximum number of files streamed concurrently per fetch
    #[arg(long = "max-open-files", default_value_t = DEFAULT_MAX_OPEN_FILES)]
    pub max_open_files: usize,

    /// Maximum number of directories listed concurrently per fetch
    #[arg(long = "max-dir-listings", default_value_t = DEFAULT_MAX_DIR_LISTINGS)]
    pub max_dir_listings: usize,

    /// Chunks buffered between producers and the connection
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text")]
    pub log_format: CliLogFormat,
}

impl Cli {
    /// Socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Root directory to serve: `--root`, else `$HOME`.
    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::var_os("HOME")
                .map(PathBuf::from)
                .ok_or_else(|| Error::Config {
                    message: "no --root given and HOME is not set".to_string(),
                }),
        }
    }

    /// Fetch pipeline settings from the flags.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::new()
            .with_chunk_size(self.chunk_size)
            .with_max_open_files(self.max_open_files)
            .with_max_dir_listings(self.max_dir_listings)
            .with_channel_capacity(self.channel_capacity)
    }

    /// Full server configuration.
    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig::new(self.root_dir()?)
            .with_bind_addr(self.socket_addr())
            .with_fetch(self.fetch_config()))
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            root: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            max_dir_listings: DEFAULT_MAX_DIR_LISTINGS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            verbose: 0,
            log_file: None,
            log_format: CliLogFormat::Text,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
