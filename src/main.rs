//! wisp-server - multiplexes TCP and UDP streams over a single WebSocket
//!
//! Accepts WebSocket connections and speaks the Wisp protocol over each
//! one, demultiplexing CONNECT/DATA/CLOSE frames into real upstream TCP
//! and UDP sockets.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use wisp_server::{server, ServerConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_DATE: &str = env!("BUILD_DATE");
const GIT_HASH: &str = env!("GIT_HASH");

#[derive(Parser)]
#[command(name = "wisp-server")]
#[command(author = "Sina Rabbani")]
#[command(version = VERSION)]
#[command(about = "Wisp protocol server", long_about = None)]
struct Cli {
    /// Address to bind the WebSocket listener on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the WebSocket listener on
    #[arg(short, long, default_value_t = 6001)]
    port: u16,

    /// Initial per-stream CONTINUE credit advertised to clients
    #[arg(long, default_value_t = wisp_server::stream::DEFAULT_CREDIT)]
    buffer_size: u32,

    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut logger = env_logger::Builder::from_default_env();
    if verbosity >= 3 {
        logger.filter_module("wisp_server", log::LevelFilter::Trace);
        logger.filter_level(log::LevelFilter::Debug);
    } else {
        logger.filter_level(level);
    }
    logger
        .format_timestamp_millis()
        .format_module_path(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let bind_addr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.host, cli.port))?;

    let config = ServerConfig {
        bind_addr,
        buffer_size: cli.buffer_size,
    };

    info!("starting wisp-server {VERSION} (commit {GIT_HASH}, built {BUILD_DATE})");

    tokio::select! {
        result = server::run(config) => {
            result.context("server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
        }
    }

    Ok(())
}
