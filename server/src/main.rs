use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::{DRAIN_BUDGET_MS, SERVER_TICK_MS, WAVE_INTERVAL_TICKS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick interval in milliseconds
    #[arg(short, long, default_value_t = SERVER_TICK_MS)]
    tick_ms: u64,

    /// Ticks between enemy waves (0 disables waves)
    #[arg(short, long, default_value_t = WAVE_INTERVAL_TICKS)]
    wave_interval: u64,

    /// Time budget in milliseconds for draining queued messages each tick
    #[arg(long, default_value_t = DRAIN_BUDGET_MS)]
    drain_budget_ms: u64,

    /// Seed for spawn positions
    #[arg(long)]
    seed: Option<u64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            tick_ms: args.tick_ms,
            wave_interval_ticks: args.wave_interval,
            drain_budget_ms: args.drain_budget_ms,
            seed: args.seed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!(
        "Starting server on {} ({} ms ticks, wave every {} ticks)",
        config.address(),
        config.tick_ms,
        config.wave_interval_ticks
    );

    let server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                let e: Box<dyn std::error::Error> = e;
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
