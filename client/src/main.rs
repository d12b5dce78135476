use clap::Parser;
use client::network::{Client, ClientConfig};
use log::info;
use shared::{Controls, SERVER_TICK_MS};
use std::time::Duration;

/// Headless bot: joins the server and holds the given controls
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Game tick interval in milliseconds
    #[arg(short, long, default_value_t = SERVER_TICK_MS)]
    tick_ms: u64,

    /// Hold up
    #[arg(long)]
    up: bool,

    /// Hold down
    #[arg(long)]
    down: bool,

    /// Hold left
    #[arg(long)]
    left: bool,

    /// Hold right
    #[arg(long)]
    right: bool,

    /// Hold fire
    #[arg(short, long)]
    fire: bool,

    /// Seconds to run before exiting; runs until disconnected when absent
    #[arg(short, long)]
    duration: Option<u64>,

    /// Reconnect after the server goes away
    #[arg(short, long)]
    reconnect: bool,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        ClientConfig {
            server: args.server,
            tick_ms: args.tick_ms,
            controls: Controls {
                up: args.up,
                down: args.down,
                left: args.left,
                right: args.right,
                fire: args.fire,
            },
            duration: args.duration.map(Duration::from_secs),
            reconnect: args.reconnect,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::from(Args::parse());
    info!("Starting client...");
    info!("Connecting to: {}", config.server);
    info!("Holding: {:?}", config.controls);

    let mut client = Client::new(config);
    client.run().await?;

    Ok(())
}
