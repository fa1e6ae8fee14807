use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adprovision_core::{
    load_config, validate_config, AdServerAdapter, BidderRegistry, HttpAdServerAdapter,
    ProductStore, SettingsStore, SqliteProductStore, SqliteSettingsStore,
};
use adprovision_server::{api::create_router, state::AppState, wizard::WizardSession};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ADPROVISION_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "Configuration loaded successfully (hash {})",
        &config_hash[..16]
    );
    info!("Database path: {:?}", config.database.path);

    // Create SQLite stores
    let product_store: Arc<dyn ProductStore> = Arc::new(
        SqliteProductStore::new(&config.database.path)
            .context("Failed to create ad product store")?,
    );
    info!("Ad product store initialized");

    // Create remote ad server adapter if configured
    let adapter: Option<Arc<dyn AdServerAdapter>> = match &config.adapter {
        Some(adapter_config) => {
            info!("Initializing ad server adapter at {}", adapter_config.url);
            let adapter = HttpAdServerAdapter::new(adapter_config.clone())
                .context("Failed to create ad server adapter")?;
            Some(Arc::new(adapter))
        }
        None => {
            info!("No ad server configured, order provisioning disabled");
            None
        }
    };

    // Build the bidder registry from config and the remote bidder list
    let registry = match &adapter {
        Some(adapter) => match BidderRegistry::load(&config.bidders, adapter.as_ref()).await {
            Ok(registry) => registry,
            Err(e) => {
                warn!("Failed to fetch bidders, using configured bidders only: {}", e);
                BidderRegistry::from_bidders(config.bidders.clone())
            }
        },
        None => BidderRegistry::from_bidders(config.bidders.clone()),
    };
    if registry.is_empty() {
        warn!("No bidders registered");
    } else {
        info!(
            "Registered {} bidders: {}",
            registry.len(),
            registry.keys().collect::<Vec<_>>().join(", ")
        );
    }
    let registry = Arc::new(registry);

    let settings_store: Arc<dyn SettingsStore> = Arc::new(
        SqliteSettingsStore::new(&config.database.path, &config.settings.prefix)
            .context("Failed to create settings store")?
            .with_registry(&registry),
    );
    info!("Settings store initialized");

    // Create the provisioning wizard
    let wizard = adapter.map(|adapter| {
        Arc::new(WizardSession::new(
            adapter,
            config.workflow.clone(),
            Arc::clone(&registry),
        ))
    });

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        product_store,
        settings_store,
        registry,
        wizard,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
