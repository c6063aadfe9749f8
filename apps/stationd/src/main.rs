mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::StationConfig;
use station_control::{ControlServer, Coordinator, Station};
use station_core::{ControlMode, Volume};
use station_device_mpd::{MpdConfig, MpdController};
use station_device_mpv::{MpvConfig, MpvController};
use station_downloads::{DownloadPipeline, StreamingDownloader, YtDlpFetcher};
use station_media_session::{MprisBackend, MprisConfig};
use station_resolver::{
    FileTokenSource, ResolverConfig, SpotifyClient, StationResolver, YtDlp, YtDlpConfig,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stationd")]
#[command(about = "Playback and download control server for mpv, MPD and MPRIS players", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to serve the control API on (overrides the config file)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Playback pairing: "process" (mpv) or "daemon" (mpd)
    #[arg(long)]
    control_mode: Option<ControlMode>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info,stationd=debug,station_control=debug")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting stream station v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().unwrap_or_else(StationConfig::default_path);
    let mut config = StationConfig::load(&config_path)?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(mode) = args.control_mode {
        config.control_mode = mode;
    }
    tracing::info!(
        "Control mode: {:?}, native client: {}",
        config.control_mode,
        config.native_client
    );

    let station = Arc::new(build_station(&config)?);

    let mut server = ControlServer::new(config.bind, station.clone());
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    server.stop().await;
    station.shutdown().await;

    tracing::info!("Stream station stopped");
    Ok(())
}

/// Wire the resolver, the three backends and the download paths together
fn build_station(config: &StationConfig) -> Result<Station> {
    let default_volume = Volume::new(i64::from(config.default_volume))
        .context("Invalid default_volume in config")?;
    let mut coordinator = Coordinator::new(config.default_volume);

    coordinator.register_backend(Box::new(MpvController::new(MpvConfig {
        binary: config.mpv.binary.clone(),
        socket_path: config.mpv.socket_path.clone(),
        default_volume: Some(default_volume),
        ..Default::default()
    })));
    coordinator.register_backend(Box::new(MpdController::new(MpdConfig {
        binary: config.mpd.binary.clone(),
        host: config.mpd.host.clone(),
        port: config.mpd.port,
    })));
    coordinator.register_backend(Box::new(MprisBackend::new(MprisConfig {
        ignore_players: config.bus.ignore_players.clone(),
        preferred_player: config.bus.preferred_player.clone(),
        settle_delay: config.settle_delay(),
    })));

    let tokens = Arc::new(FileTokenSource::new(config.spotify.token_file.clone()));
    let spotify = SpotifyClient::new(tokens, config.spotify.api_base.clone())?;
    let ytdlp = YtDlp::new(YtDlpConfig {
        binary: config.resolver.ytdlp_binary.clone(),
        metadata_timeout: Duration::from_secs(config.resolver.metadata_timeout_secs),
        search_timeout: Duration::from_secs(config.resolver.search_timeout_secs),
    });
    let resolver = StationResolver::new(
        ResolverConfig {
            control_mode: config.control_mode,
            native_client: config.native_client,
        },
        ytdlp,
        spotify,
    );

    let fetcher = YtDlpFetcher::new(config.resolver.ytdlp_binary.clone(), config.download_dir.clone());
    let downloads = DownloadPipeline::start(Arc::new(fetcher));
    let streaming = StreamingDownloader::new(
        config.downloads.spotdl_binary.clone(),
        config.download_dir.clone(),
    );
    tracing::info!("Downloads go to {}", config.download_dir.display());

    Ok(Station::new(
        Arc::new(resolver),
        coordinator.into_shared(),
        downloads,
        streaming,
    ))
}
