use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rns::config::{Config, DEFAULT_WORKERS};
use rns::server::Server;

#[derive(Parser, Debug)]
#[command(version, about = "Recursive DNS resolver and caching name server")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// UDP listen address, repeatable
    #[arg(long = "udp", value_name = "ADDR", default_value = "0.0.0.0:2053")]
    udp_addresses: Vec<String>,

    /// TCP listen address, repeatable
    #[arg(long = "tcp", value_name = "ADDR")]
    tcp_addresses: Vec<String>,

    /// Number of resolver workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the flag when both are set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = Config {
        workers: args.workers,
        udp_addresses: args.udp_addresses,
        tcp_addresses: args.tcp_addresses,
        ..Config::default()
    };

    let server = Server::new(config);

    let shutdown = server.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            shutdown.cancel();
        }
    });

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "failed to start server");
            ExitCode::FAILURE
        }
    }
}
