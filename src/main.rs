use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tvtuner::logo::{HttpTransport, LogoCache};
use tvtuner::player::Player;
use tvtuner::session::Session;
use tvtuner::settings::Settings;
use tvtuner::{create_app, m3u};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// M3U/M3U8 playlist to browse
    playlist: PathBuf,

    /// Path to configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Print the parsed playlist and exit
    #[arg(long)]
    list: bool,

    /// Listen address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let settings = Settings::load(&args.config)?;
    info!("Configuration loaded from {}: {:?}", args.config, settings);

    let (playlist, total) = m3u::load(&args.playlist)?;
    if args.list {
        print!("{}", playlist);
        println!("\n({} channels)", total);
        return Ok(());
    }
    if total == 0 {
        warn!("No channels found in {}", args.playlist.display());
    }

    // The blocking HTTP client has to be built before the async runtime starts.
    let transport = HttpTransport::new(&settings.cache.user_agent, settings.cache.timeout())?;
    let logos = LogoCache::new(&settings.cache.dir, Box::new(transport));
    let session = Session::new(playlist, logos);
    let player = Player::new(settings.player.clone());

    let host = args.host.unwrap_or(settings.server.host);
    let port = args.port.unwrap_or(settings.server.port);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let app = create_app(session, player);
        let addr = format!("{}:{}", host, port);
        info!("Listening on http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;
        Ok::<(), anyhow::Error>(())
    })
}
