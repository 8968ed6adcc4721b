//! rfsb server binary entry point.
//!
//! Serves browse and fetch requests over TCP.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use rfsb_server::{Cli, Server};

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = rfsb_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), "rfsb-server starting");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("rfsb-server: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(&cli)) {
        error!(error = %e, "Server failed");
        eprintln!("rfsb-server: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> rfsb_core::Result<()> {
    let config = cli.server_config()?;
    info!(
        addr = %config.bind_addr,
        root = %config.root.display(),
        chunk_size = config.fetch.chunk_size,
        max_open_files = config.fetch.max_open_files,
        "Binding server"
    );
    let server = Server::bind(config).await?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal.cancel();
        }
    });

    server.serve(shutdown).await
}
