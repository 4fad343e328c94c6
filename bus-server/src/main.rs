use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bus_server::booking::FlowSettings;
use bus_server::config::AppConfig;
use bus_server::delivery::{LogChannel, sweep_due};
use bus_server::store::{Clock, MemoryStore, SessionDraftStore, SystemClock};
use bus_server::web::{AppState, create_router};

/// Most sessions holding a draft at once.
const MAX_DRAFT_SESSIONS: u64 = 10_000;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bus_server=debug")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");
    let topology = config.load_topology().expect("Failed to load routes");
    info!(routes = topology.len(), "loaded route topology");

    let store = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = FlowSettings {
        reject_seat_conflicts: config.reject_seat_conflicts,
        closing_time: config.closing_time,
    };
    let state = AppState::new(
        Arc::clone(&store),
        SessionDraftStore::new(config.draft_ttl, MAX_DRAFT_SESSIONS),
        topology,
        Arc::clone(&clock),
        settings,
    );

    // Deliver due notifications in the background
    let sweep_store = Arc::clone(&store);
    let period = config.delivery_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            if let Err(e) = sweep_due(sweep_store.as_ref(), &LogChannel, clock.now()).await {
                error!(error = %e, "delivery sweep failed");
            }
        }
    });

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    info!(addr = %config.bind_addr, "bus booking server listening");

    axum::serve(listener, app).await.expect("Server error");
}
