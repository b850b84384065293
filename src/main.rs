use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::path::PathBuf;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_catalog_server::catalog_store::{
    ConsistencyEngine, SqliteCatalogStore, StoreConfig, TracksCache,
};
use music_catalog_server::config::{AppConfig, CliConfig, FileConfig};
use music_catalog_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding catalog.db. Can also be set in the config file.
    #[clap(value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// How long a catalog operation may wait for the store before failing.
    #[clap(long, default_value_t = 5000)]
    pub store_timeout_ms: u64,

    /// Number of read-only connections kept open next to the writer.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,

    /// Cache the full track listing between writes.
    #[clap(long)]
    pub tracks_cache: bool,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            store_timeout_ms: args.store_timeout_ms,
            read_pool_size: args.read_pool_size,
            tracks_cache: args.tracks_cache,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config)?;

    let db_path = app_config.catalog_db_path();
    info!("Opening SQLite catalog database at {:?}...", db_path);
    let store = Arc::new(SqliteCatalogStore::open(
        &db_path,
        &StoreConfig {
            read_pool_size: app_config.read_pool_size,
            busy_timeout: app_config.store_timeout,
        },
    )?);

    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::set_catalog_items(&store.counts()?);

    let cache = TracksCache::new(
        app_config.tracks_cache.enabled,
        app_config.tracks_cache.ttl,
    );
    if cache.is_enabled() {
        info!("Tracks cache enabled, ttl {:?}", app_config.tracks_cache.ttl);
    }
    let engine = Arc::new(ConsistencyEngine::new(
        store.clone(),
        cache,
        app_config.store_timeout,
    ));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };
    let served = run_server(server_config, engine, shutdown_signal()).await;

    store.close()?;
    info!("Catalog store closed");
    served
}
