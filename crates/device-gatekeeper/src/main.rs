//! Device Gatekeeper - Entry point.

use device_gatekeeper::{
    api::{create_router_with_rate_limit, AppState, RateLimitState},
    auth,
    config::{Config, LogFormat},
    RegistrationStore,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let subscriber = tracing_subscriber::registry().with(filter);
    match config.log.format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }

    info!("Starting Device Gatekeeper");

    // Initialize storage
    let backend = match config.storage.backend() {
        Ok(b) => b,
        Err(e) => {
            error!("Invalid storage configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = match RegistrationStore::open(backend).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open registration store: {}", e);
            std::process::exit(1);
        }
    };

    let authorizer = auth::from_config(&config.admin);

    // Create application state
    let state = AppState::new(store, authorizer);

    let rate_limit = RateLimitState::from_config(&config.rate_limit);
    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
