//! Client CLI implementation.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use rfsb_core::protocol::FetchRequest;

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

/// rfsb - browse a remote file tree and fetch files with verification.
#[derive(Debug, Parser)]
#[command(
    name = "rfsb",
    version,
    about = "rfsb - browse a remote file tree and fetch files with verification"
)]
pub struct Cli {
    /// Server address (host:port)
    #[arg(short = 's', long = "server", default_value = "localhost:50051", global = true)]
    pub server: String,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text", global = true)]
    pub log_format: CliLogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the contents of a remote directory
    Browse {
        /// Directory relative to the server root (default: the root itself)
        #[arg(default_value = "")]
        dir: String,
    },
    /// Fetch remote files and directories
    Fetch(FetchArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Remote directory to fetch recursively (repeatable)
    #[arg(short = 'd', long = "dir", value_name = "DIR", action = ArgAction::Append)]
    pub dirs: Vec<String>,

    /// Remote file to fetch (repeatable)
    #[arg(short = 'f', long = "file", value_name = "FILE", action = ArgAction::Append)]
    pub files: Vec<String>,

    /// Local directory to write into (default: current directory)
    #[arg(short = 'o', long = "dest", value_name = "DIR")]
    pub dest: Option<PathBuf>,
}

impl FetchArgs {
    pub fn request(&self) -> FetchRequest {
        FetchRequest::new(self.dirs.iter().cloned(), self.files.iter().cloned())
    }

    /// Destination directory, defaulting to `.`.
    pub fn dest_dir(&self) -> PathBuf {
        self.dest.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
