//! modweb server binary

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use modweb::config::ServerConfig;
use modweb::config_file::{generate_default_config, ConfigFile};
use modweb::error::{Result, ServeError};
use modweb::http::{create_router, spawn_redirect_listeners};
use modweb::modules::default_library;
use modweb::settings::spawn_ttl_listener;
use modweb::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "modweb";

#[derive(Debug, Parser)]
#[command(name = "modweb", version, about = "Serve a resource tree with pluggable handler modules")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "modweb.toml")]
    config: PathBuf,

    /// Resource root, overriding the configuration file
    #[arg(short, long)]
    root: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    verbosity: Option<String>,

    /// Write a default configuration file to the --config path and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.init_config {
        generate_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    // Load configuration before logging so the configured level applies
    let loaded = if args.config.exists() {
        Some(ConfigFile::from_file(&args.config).map(ConfigFile::into_server_config))
    } else {
        None
    };
    let mut config = match &loaded {
        Some(Ok(config)) => config.clone(),
        _ => ServerConfig::default(),
    };
    if let Some(root) = args.root {
        config.resources.root = root;
    }
    if let Some(level) = args.verbosity {
        config.log_level = level;
    }

    init_logging(&config);
    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    match loaded {
        Some(Err(e)) => tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            args.config.display(),
            e
        ),
        None => tracing::info!(
            "No config file at {}, using defaults",
            args.config.display()
        ),
        Some(Ok(_)) => tracing::info!("Configuration loaded from {}", args.config.display()),
    }

    config.resources.root = absolute(&config.resources.root)?;
    config.resources.module_root = absolute(&config.resources.module_root)?;
    tracing::info!("Configuration: {:?}", config);

    // Create application state
    let library = default_library();
    tracing::info!("Modules available: {:?}", library.names());
    let state = Arc::new(AppState::new(config.clone(), library));
    let ready = state.preload_handlers().await;
    tracing::info!("{} of {} bound handlers ready", ready, config.bindings.len());
    let _ttl_listener = spawn_ttl_listener(&state.settings, state.cache.clone());

    // Build router
    let app = create_router(state);
    let _redirects = spawn_redirect_listeners(&config).await;

    // Start server
    let addr: SocketAddr = config
        .socket_addr()
        .parse()
        .map_err(|e| {
            ServeError::Config(format!("invalid listen address {}: {}", config.socket_addr(), e))
        })?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Initialize logging with tracing
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("modweb={0},tower_http={0}", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn absolute(path: &str) -> Result<String> {
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(absolute.to_string_lossy().into_owned())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
