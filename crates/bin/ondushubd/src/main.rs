//! # ondushubd — ondushub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise logging
//! - Construct the accessory cache, history store, event bus and
//!   application services
//! - Set up the Ondus platform (login, discovery) and start its pollers
//! - Build the axum router, injecting the services and the platform
//! - Bind to a TCP port and serve until Ctrl-C, then tear the platform down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ondushub_adapter_http_axum::state::AppState;
use ondushub_adapter_ondus::OndusPlatform;
use ondushub_app::accessory_cache::InMemoryAccessoryCache;
use ondushub_app::event_bus::{InProcessEventBus, Subscription};
use ondushub_app::history_store::InMemoryHistory;
use ondushub_app::ports::Platform;
use ondushub_app::services::accessory_service::AccessoryService;
use ondushub_app::services::history_service::HistoryService;
use ondushub_app::services::platform_context::ServiceContext;
use ondushub_domain::event::EventType;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {err}", config.logging.filter);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));
    tokio::spawn(log_events(event_bus.subscribe()));

    // Services
    let accessory_service = Arc::new(AccessoryService::new(
        InMemoryAccessoryCache::new(),
        Arc::clone(&event_bus),
    ));
    let history_service = Arc::new(HistoryService::new(InMemoryHistory::new()));
    if config.ondus.history {
        tracing::info!("measurement history enabled");
    }
    let ctx = ServiceContext::new(
        Arc::clone(&accessory_service),
        Arc::clone(&history_service),
        Arc::clone(&event_bus),
    );

    // Platform
    let mut platform = OndusPlatform::new(config.ondus.clone(), ctx)?;
    platform.setup().await?;
    platform.start_background().await?;
    let platform = Arc::new(platform);

    // HTTP
    let state = AppState::new(accessory_service, history_service, Arc::clone(&platform));
    let app = ondushub_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("ondushubd listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    platform.teardown().await?;
    tracing::info!("ondushubd stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl-C, shutting down"),
        Err(err) => tracing::error!(%err, "unable to listen for Ctrl-C"),
    }
}

async fn log_events(mut events: Subscription) {
    while let Some(event) = events.recv().await {
        if event.event_type == EventType::NotificationReceived {
            tracing::info!(
                accessory_id = ?event.accessory_id,
                data = %event.data,
                "appliance notification"
            );
        } else {
            tracing::debug!(
                event_type = ?event.event_type,
                accessory_id = ?event.accessory_id,
                data = %event.data,
                "event"
            );
        }
    }
}
