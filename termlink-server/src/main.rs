//! termlink server binary

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use termlink_server::{server, ConfigLoader, NativePtyBackend};
use termlink_utils::{init_logging_with_config, LogConfig, Result};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "termlink-server", version, about = "Interactive shells over a WebSocket")]
struct Cli {
    /// Address to listen on, overriding the config file
    #[arg(short, long)]
    bind: Option<String>,

    /// Config file to load instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log to a file in the state directory instead of stderr
    #[arg(long)]
    log_file: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.log_file {
        LogConfig::daemon()
    } else {
        LogConfig::server()
    };
    let log_config = if cli.verbose {
        log_config.with_filter("debug")
    } else {
        log_config
    };
    init_logging_with_config(log_config)?;

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_and_validate_from(path)?,
        None => ConfigLoader::load_and_validate()?,
    };
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "termlink server starting");
    server::run(config, Arc::new(NativePtyBackend)).await
}
