//! A TCP echo server for checking that a host/port is reachable and that a
//! round trip through proxies, load balancers or container networks works.
//!
//! Connections flow from the [`Listener`] through the accept task in
//! [`dispatch`] into a bounded queue, which the loop in [`shutdown`] drains
//! until a [`StopSignal`] fires, handing each connection to [`echo`].

pub mod dispatch;
pub mod echo;
mod error;
pub mod listener;
pub mod shutdown;

pub use error::{Error, Result};
pub use listener::{CloseHandle, Listener, PendingConnection};
pub use shutdown::{serve, StopSignal};

// COMMAND LINE //

use clap::Parser;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9000";
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(version, about = "TCP echo server for network smoke tests", long_about = None)]
pub struct Cli {
    /// Address to listen on, as host:port
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Accepted connections that may wait for dispatch before accepting pauses
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_QUEUE_CAPACITY,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..),
    )]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub address: String,
    pub queue_capacity: usize,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            address: cli.address,
            queue_capacity: cli.queue_capacity,
        }
    }
}

pub fn parse_config() -> Config {
    Cli::parse().into()
}

// LOGGING //

const LOGS_DIR: &str = "logs";

use std::io::{self, IsTerminal};
use tracing_appender::{non_blocking::WorkerGuard, rolling::{RollingFileAppender, Rotation}};
use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn stderr_logging() {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::Layer::new()
            .without_time()
            .compact()
            .with_target(false)
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr));
    tracing::subscriber::set_global_default(subscriber)
            .expect("Unable to set a global subscriber");
}

pub fn file_logging(rotation: Rotation, log_file: &str) -> WorkerGuard {
    let _ = std::fs::create_dir(LOGS_DIR);
    let file_appender = RollingFileAppender::new(rotation, LOGS_DIR, log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::Layer::new().compact().with_ansi(false).with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
            .expect("Unable to set a global subscriber");
    guard
}

// MISC //

pub fn connection_refused(tried: &str) -> String {
    let mut msg = format!("No server listening on {tried}\n");
    msg.push_str("Try running: cargo run --release --bin smoke-test");
    if tried != DEFAULT_ADDRESS {
        msg.push_str(" -- --address ");
        msg.push_str(tried);
    }
    msg
}
