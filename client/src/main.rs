use clap::Parser;
use client::app::App;
use client::dots::{generate_dots, DotFieldConfig};
use client::game::GameClient;
use client::images::{validate_image_url, FileImageLoader, ImageCache};
use client::lobby::Lobby;
use client::network::TransportBridge;
use log::{error, info, warn};
use macroquad::window::Conf;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{obstacles, CANVAS_HEIGHT, CANVAS_WIDTH, DOT_COUNT};
use std::time::Duration;

/// How long to wait for `Disconnect` to leave before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Avatar image (path or file:// URL) shown instead of the default glyph
    #[arg(short = 'i', long, default_value = "", value_parser = validate_image_url)]
    image_url: String,

    /// Game ID to pre-fill in the lobby
    #[arg(short = 'j', long, default_value = "")]
    join: String,

    /// Seed for the dot layout (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "MultiPac".to_string(),
        window_width: CANVAS_WIDTH as i32,
        window_height: CANVAS_HEIGHT as i32,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the I/O runtime: {}", e);
            return;
        }
    };

    let app = match build_app(&args, runtime.handle()) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start client: {}", e);
            return;
        }
    };

    info!("Controls: arrow keys to move, Enter to create or join a game, Escape to quit");
    if let Some(transport) = app.run().await {
        if runtime
            .block_on(tokio::time::timeout(SHUTDOWN_GRACE, transport))
            .is_err()
        {
            warn!("Transport did not close in time");
        }
    }
    info!("Client shut down");
}

fn build_app(
    args: &Args,
    runtime: &tokio::runtime::Handle,
) -> Result<App, Box<dyn std::error::Error>> {
    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let config = DotFieldConfig::new(DOT_COUNT, CANVAS_WIDTH, CANVAS_HEIGHT);
    let walls = obstacles();
    let dots = generate_dots(&mut rng, &config, &walls)?;

    let images = ImageCache::new(Box::new(FileImageLoader::new(runtime.clone())));
    let game = GameClient::new(dots, walls, images).with_image_url(args.image_url.clone());
    let bridge = TransportBridge::connect_udp(&args.server, args.fake_ping, runtime)?;

    Ok(App::new(game, Lobby::new(args.join.clone()), bridge))
}
