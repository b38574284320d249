#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use smoke_test::{parse_config, serve, stderr_logging, Config, Listener, StopSignal};

#[tokio::main]
async fn main() {
    let config = parse_config();
    stderr_logging();
    if let Err(err) = run(config).await {
        tracing::error!("Fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let stop = StopSignal::ctrl_c();
    let listener = Listener::bind(&config.address).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    serve(listener, stop, config.queue_capacity).await;
    Ok(())
}
