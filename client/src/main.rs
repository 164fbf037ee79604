use clap::Parser;
use client::input::{spawn_autoplay, MoveSource};
use client::{Client, ClientConfig, HttpDirectory, TextRenderer, WebSocketDialer};
use log::info;
use shared::ServerEndpoint;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory service that hands out game servers
    #[arg(short = 'd', long, default_value = shared::DEFAULT_DIRECTORY_ADDR)]
    directory: String,

    /// Connect to this game server (host:port) instead of asking the directory
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Board width and height
    #[arg(short = 'g', long, default_value_t = shared::GRID_SIZE)]
    grid_size: usize,

    /// Delay between directory attempts in milliseconds
    #[arg(long, default_value_t = shared::DISCOVERY_RETRY_DELAY_MS)]
    retry_ms: u64,

    /// Directory request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    request_timeout_ms: u64,

    /// WebSocket path on the game server
    #[arg(long, default_value = shared::GAME_SOCKET_PATH)]
    path: String,

    /// Milliseconds between moves
    #[arg(short = 'i', long, default_value_t = shared::DEFAULT_MOVE_INTERVAL_MS)]
    interval: u64,

    /// Moves to play, e.g. "urdl"; random moves when omitted
    #[arg(short = 'm', long)]
    moves: Option<String>,

    /// Seed for random moves
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn config(&self) -> Result<ClientConfig, Box<dyn std::error::Error>> {
        let server = match &self.server {
            Some(addr) => Some(addr.parse::<ServerEndpoint>()?),
            None => None,
        };

        Ok(ClientConfig {
            directory_addr: self.directory.clone(),
            server,
            grid_size: self.grid_size,
            retry_delay: Duration::from_millis(self.retry_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            socket_path: self.path.clone(),
            move_interval: Duration::from_millis(self.interval),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = args.config()?;

    let source = match &args.moves {
        Some(moves) => MoveSource::scripted(moves)?,
        None => MoveSource::random(args.seed),
    };

    info!("Starting client...");
    match &config.server {
        Some(server) => info!("Game server: {}", server),
        None => info!("Directory: {}", config.directory_addr),
    }
    info!("Playing a move every {}ms", args.interval);

    let directory = Arc::new(HttpDirectory::new(&config.directory_addr, config.request_timeout)?);
    let dialer = Arc::new(WebSocketDialer::new(config.socket_path.clone()));
    let mut client = Client::new(&config, directory, dialer, TextRenderer::stdout());

    let (input_tx, input_rx) = mpsc::channel(16);
    let autoplay = spawn_autoplay(source, config.move_interval, input_tx);

    client.run(input_rx).await?;
    autoplay.abort();

    Ok(())
}
