//! Tracing setup shared by the rfsb client and server binaries.
//!
//! Verbosity is a `-v` count, `RUST_LOG` overrides it, and output goes to
//! stderr or an append-mode log file in text or JSON form.

use std::path::Path;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, Result};

/// Crates whose events are enabled by the verbosity flag.
const LOG_TARGETS: &[&str] = &["rfsb", "rfsb_core", "rfsb_client", "rfsb_server"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

/// Map a `-v` count to a tracing level name.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    }
}

/// Build the default filter directives, e.g. `rfsb=info,rfsb_core=info,...`.
fn filter_directives(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging system.
///
/// # Arguments
///
/// * `verbosity` - Verbosity level (0=error, 1=warn, 2=info, 3=debug, 4+=trace)
/// * `log_file` - Optional path to append logs to instead of stderr
/// * `format` - Output format (text or JSON)
pub fn init_logging(verbosity: u8, log_file: Option<&Path>, format: LogFormat) -> Result<()> {
    let level = level_for_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            (BoxMakeWriter::new(file), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_file(verbosity >= 3)
                    .with_line_number(verbosity >= 3),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
    };

    installed.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))
}

/// Initialize logging with defaults for testing.
///
/// Errors are ignored since a subscriber may already be installed.
pub fn init_test_logging() {
    let _ = init_logging(2, None, LogFormat::Text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn verbosity_mapping() {
        assert_eq!(level_for_verbosity(0), "error");
        assert_eq!(level_for_verbosity(2), "info");
        assert_eq!(level_for_verbosity(3), "debug");
        assert_eq!(level_for_verbosity(9), "trace");
    }

    #[test]
    fn directives_cover_all_crates() {
        let directives = filter_directives("debug");
        assert_eq!(
            directives,
            "rfsb=debug,rfsb_core=debug,rfsb_client=debug,rfsb_server=debug"
        );
    }

    #[test]
    fn test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
    }
}
