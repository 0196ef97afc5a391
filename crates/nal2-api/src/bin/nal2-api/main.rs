use clap::Parser;
use nal2::history::{HistoryService, JsonFileHistoryRepository};
use nal2::storage::{LocalStorage, Storage};
use nal2::{Gateway, ReferenceEngine, Topology};
use nal2_api::{ApiConfig, AppState, build_app};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// NAL-NL2 gateway server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "NAL2_HOST")]
    host: Option<String>,

    /// Port to listen on (8080 in-process, 3000 relay)
    #[arg(short, long, env = "NAL2_PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "NAL2_LOG_LEVEL")]
    log_level: Option<String>,

    /// Config file path
    #[arg(short, long, env = "NAL2_CONFIG")]
    config_file: Option<PathBuf>,

    /// How calls reach the engine (in-process, relay)
    #[arg(short, long, env = "NAL2_TOPOLOGY")]
    topology: Option<Topology>,

    /// Seconds to wait for a relayed reply
    #[arg(long, env = "NAL2_CALL_TIMEOUT_SECS")]
    call_timeout_secs: Option<u64>,

    /// History store file
    #[arg(long, env = "NAL2_DATA_FILE")]
    data_file: Option<String>,

    /// Directory of recorded call fixtures
    #[arg(long, env = "NAL2_TEST_DATA_DIR")]
    test_data_dir: Option<String>,

    /// Disable Swagger UI
    #[arg(long, env = "NAL2_DISABLE_SWAGGER", default_value_t = false)]
    disable_swagger: bool,
}

fn load_config(cli: &Cli) -> ApiConfig {
    let Some(config_path) = &cli.config_file else {
        return ApiConfig::default();
    };
    match ApiConfig::load_from_file(config_path) {
        Ok(cfg) => {
            info!("Configuration loaded from: {}", config_path.display());
            cfg
        }
        Err(e) => {
            warn!(
                "Failed to load config file: {}. Using default configuration.",
                e
            );
            ApiConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());
    let filter = format!("nal2_api={level},nal2={level},nal2_core={level},tower_http=debug");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration, then override with CLI options
    let mut config = load_config(&cli);
    if let Some(host) = cli.host {
        config.host = host;
    }
    if cli.port.is_some() {
        config.port = cli.port;
    }
    if let Some(topology) = cli.topology {
        config.topology = topology;
    }
    if let Some(secs) = cli.call_timeout_secs {
        config.relay.call_timeout_secs = secs;
    }
    if let Some(data_file) = cli.data_file {
        config.store.data_file = data_file;
    }
    if cli.test_data_dir.is_some() {
        config.store.test_data_dir = cli.test_data_dir;
    }
    config.log_level = level;
    if cli.disable_swagger {
        config.enable_swagger = false;
    }

    let addr = config.socket_addr()?;

    // Assemble the gateway for the chosen topology
    let builder = Gateway::builder(env!("CARGO_PKG_NAME"));
    let gateway = match config.topology {
        Topology::InProcess => {
            warn!("Using the reference engine; gains are placeholders, not NAL-NL2 prescriptions");
            builder.in_process(ReferenceEngine::new()).build()?
        }
        Topology::Relay => builder.relay(config.relay.clone()).build()?,
    };

    let mut state = AppState::new(gateway, config.clone());
    if config.topology == Topology::Relay {
        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new("."));
        let repository = JsonFileHistoryRepository::new(storage, config.store.data_file.clone());
        repository.init().await?;
        let history = HistoryService::with_config(Arc::new(repository), &config.store);
        state = state.with_history(Arc::new(history));
        info!("History store: {}", config.store.data_file);
    }
    if let Some(dir) = &config.store.test_data_dir {
        state = state.with_fixtures(Arc::new(LocalStorage::new(dir)));
        info!("Test data directory: {}", dir);
    }

    // Build application
    let app = build_app(state);

    // Start server
    info!("Starting {} gateway on: {}", config.topology, addr);
    if config.enable_swagger {
        info!("Swagger UI: http://{}/swagger-ui", addr);
    }
    if config.topology == Topology::Relay {
        info!("Engine and frontend channels: ws://{}/ws", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
