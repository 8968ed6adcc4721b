//! rfsb client binary entry point.

use clap::Parser;
use tracing::{error, info};

use rfsb_client::{Cli, Client, Command, FetchArgs, FileReport, FileStatus};
use rfsb_core::transport::TcpTransport;

fn main() {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = rfsb_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(version = env!("CARGO_PKG_VERSION"), server = %cli.server, "rfsb starting");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("rfsb: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    match rt.block_on(run(&cli)) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!(error = %e, "Request failed");
            eprintln!("rfsb: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run the requested command; `Ok(false)` means some file did not verify.
async fn run(cli: &Cli) -> rfsb_core::Result<bool> {
    let mut client = Client::connect(cli.server.as_str()).await?;
    let ok = match &cli.command {
        Command::Browse { dir } => {
            browse(&mut client, dir).await?;
            true
        }
        Command::Fetch(args) => fetch(&mut client, args).await?,
    };
    client.close();
    Ok(ok)
}

async fn browse(client: &mut Client<TcpTransport>, dir: &str) -> rfsb_core::Result<()> {
    let listing = client.browse(dir).await?;
    for name in &listing.dirs {
        println!("{}/", name);
    }
    for name in &listing.files {
        println!("{}", name);
    }
    Ok(())
}

async fn fetch(client: &mut Client<TcpTransport>, args: &FetchArgs) -> rfsb_core::Result<bool> {
    let report = client
        .fetch_with(args.request(), &args.dest_dir(), print_file)
        .await?;

    // Files cut off by the end of the stream never reached the callback.
    for file in &report.files {
        if matches!(file.status, FileStatus::Incomplete { .. }) {
            print_file(file);
        }
    }

    if let Some(summary) = report.summary {
        println!(
            "{} of {} files verified ({} chunks, {} bytes)",
            report.verified_count(),
            report.files.len(),
            summary.chunks,
            summary.bytes
        );
    }
    Ok(report.all_verified())
}

fn print_file(file: &FileReport) {
    match &file.status {
        FileStatus::Verified => println!("OK       {} ({} bytes)", file.name, file.bytes),
        status => println!("FAILED   {}: {}", file.name, status),
    }
}
