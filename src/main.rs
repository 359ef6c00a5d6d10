//! Frame Relay server
//!
//! Accepts camera uploads, serves the live stream and the archive
//! browser.

use clap::Parser;
use frame_relay::{
    archive::{BoundedArchive, FrameStore, MemoryFrameStore},
    codec::FrameCodec,
    config::{FileConfig, StoreBackend, StoreConfig},
    history::HistoryService,
    ingest::IngestPipeline,
    live::LiveFrameSlot,
    metrics::MetricsRegistry,
    server::{AppState, Server},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "frame-relay")]
#[command(about = "Camera frame relay with live MJPEG view and bounded archive")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store connection URI (mongodb://..., mongodb+srv://... or memory://)
    #[arg(long, env = "MONGO_URI")]
    store_uri: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Archive capacity in frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// IANA timezone for watermarks and history dates
    #[arg(long)]
    timezone: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<FileConfig, frame_relay::ConfigError> {
        let mut config = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        if let Some(uri) = &self.store_uri {
            config.store.uri = Some(uri.clone());
        }
        if let Some(port) = self.port {
            config.server.bind_addr.set_port(port);
        }
        if let Some(max_frames) = self.max_frames {
            config.archive.max_frames = max_frames;
        }
        if let Some(timezone) = &self.timezone {
            config.general.timezone = timezone.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn FrameStore>, String> {
    match config.backend().map_err(|e| e.to_string())? {
        StoreBackend::Memory => {
            warn!("Using in-memory frame store; the archive is lost on exit");
            Ok(Arc::new(MemoryFrameStore::new()))
        }
        #[cfg(feature = "mongo")]
        StoreBackend::Mongo(uri) => {
            let store = frame_relay::archive::MongoFrameStore::connect(
                &uri,
                config.database.as_deref(),
                &config.collection,
            )
            .await
            .map_err(|e| e.to_string())?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongo"))]
        StoreBackend::Mongo(uri) => Err(format!("store URI {uri:?} needs the `mongo` feature")),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Frame Relay v{}", frame_relay::VERSION);

    // Validated above
    let timezone = match config.general.timezone() {
        Ok(tz) => tz,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let store = match open_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open frame store: {}", e);
            std::process::exit(1);
        }
    };

    let metrics = match MetricsRegistry::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            error!("Failed to create metrics registry: {}", e);
            std::process::exit(1);
        }
    };

    let archive = Arc::new(BoundedArchive::new(store.clone(), &config.archive));
    let slot = LiveFrameSlot::new();
    let pipeline = Arc::new(IngestPipeline::new(
        FrameCodec::from_config(&config.codec),
        slot.clone(),
        archive.clone(),
        timezone,
        metrics.clone(),
    ));

    info!(
        timezone = %timezone,
        max_frames = archive.max_frames(),
        strict_capacity = config.archive.strict_capacity,
        jpeg_quality = config.codec.jpeg_quality,
        "Relay configured"
    );

    let state = AppState {
        pipeline,
        slot,
        history: HistoryService::new(archive, timezone),
        store,
        metrics,
    };

    if let Err(e) = Server::new(config.server, state).run(shutdown_signal()).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }

    info!("Done");
}
