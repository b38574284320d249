use std::ops::{AddAssign, RangeInclusive};
use clap::Parser;
use smoke_test::{connection_refused, file_logging, stderr_logging, DEFAULT_ADDRESS};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{
    tcp::{OwnedReadHalf, OwnedWriteHalf},
    TcpStream,
};
use tokio::task::JoinSet;
use tracing_appender::rolling::Rotation;

const PAYLOAD_LEN: RangeInclusive<usize> = 1..=4096;

#[derive(Parser)]
#[command(about = "Swarm of clients checking a smoke-test server echoes faithfully", long_about = None)]
struct Cli {
    /// Server address, as host:port
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Concurrent connections to open
    #[arg(short, long, default_value_t = 10)]
    bots: usize,

    /// Payloads each connection sends
    #[arg(short, long, default_value_t = 100)]
    msgs: usize,

    /// Log to logs/<FILE> instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<String>,
}

struct Bot {
    msgs: usize,
    writer: OwnedWriteHalf,
    reader: OwnedReadHalf,
    stats: Stats,
}

#[derive(Default, Debug)]
struct Stats {
    sent_bytes: usize,
    got_bytes: usize,
    round_trips: usize,
    mismatches: usize,
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Self) {
        self.sent_bytes += rhs.sent_bytes;
        self.got_bytes += rhs.got_bytes;
        self.round_trips += rhs.round_trips;
        self.mismatches += rhs.mismatches;
    }
}

fn random_payload() -> Vec<u8> {
    let mut payload = vec![0u8; fastrand::usize(PAYLOAD_LEN)];
    fastrand::fill(&mut payload);
    payload
}

impl Bot {
    async fn new(addr: &str, msgs: usize) -> anyhow::Result<Self> {
        let conn = TcpStream::connect(addr).await?;
        let (reader, writer) = conn.into_split();
        Ok(Self {
            msgs,
            writer,
            reader,
            stats: Stats::default(),
        })
    }
    async fn echo(mut self) -> anyhow::Result<Stats> {
        let mut echoed = Vec::with_capacity(*PAYLOAD_LEN.end());
        for _ in 0..self.msgs {
            let payload = random_payload();
            self.writer.write_all(&payload).await?;
            self.stats.sent_bytes += payload.len();
            echoed.resize(payload.len(), 0);
            self.reader.read_exact(&mut echoed).await?;
            self.stats.got_bytes += echoed.len();
            self.stats.round_trips += 1;
            if echoed != payload {
                self.stats.mismatches += 1;
            }
        }
        // half-close, anything still coming back is extra
        self.writer.shutdown().await?;
        let mut extra = Vec::new();
        self.reader.read_to_end(&mut extra).await?;
        if !extra.is_empty() {
            tracing::warn!("server sent {} unexpected bytes after the last echo", extra.len());
            self.stats.got_bytes += extra.len();
            self.stats.mismatches += 1;
        }
        Ok(self.stats)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = match &cli.log_file {
        Some(log_file) => Some(file_logging(Rotation::NEVER, log_file)),
        None => {
            stderr_logging();
            None
        }
    };
    let conn = match TcpStream::connect(&cli.address).await {
        Ok(conn) => conn,
        Err(err) => {
            match err.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    tracing::error!("{}", connection_refused(&cli.address));
                    std::process::exit(1)
                }
                // got unexpected err, re-throw
                _ => Err(err)?,
            }
        }
    };
    drop(conn);

    let mut stats = Stats::default();
    let mut failed = 0;
    let mut set = JoinSet::new();
    tracing::info!("spawning {} bots", cli.bots);
    for _ in 0..cli.bots {
        let bot = Bot::new(&cli.address, cli.msgs).await?;
        set.spawn(bot.echo());
    }

    tracing::info!("waiting for all bots to finish");
    while let Some(join_result) = set.join_next().await {
        match join_result? {
            Ok(bot_stats) => stats += bot_stats,
            Err(err) => {
                failed += 1;
                tracing::error!("{err}");
            }
        }
    }

    tracing::info!("sent bytes  - {}", stats.sent_bytes);
    tracing::info!("got bytes   - {}", stats.got_bytes);
    tracing::info!("round trips - {}", stats.round_trips);
    tracing::info!("mismatches  - {}", stats.mismatches);

    if stats.mismatches > 0 || failed > 0 {
        anyhow::bail!("{} mismatched echoes, {failed} failed bots", stats.mismatches);
    }
    Ok(())
}
