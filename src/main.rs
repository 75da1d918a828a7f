use std::sync::Arc;

use appointment_booking::booking::{self, BookingRouteState, BookingWorkflow, SessionRegistry};
use appointment_booking::config::BookingConfig;
use appointment_booking::store::InMemoryStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BookingConfig::from_env()?;

    eprintln!("📅 Appointment booking v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/sessions", config.port);
    eprintln!("   Display zone: {}", config.display_time_zone);
    eprintln!(
        "   Default hours: {} - {}\n",
        config.default_window.start.format("%H:%M"),
        config.default_window.end.format("%H:%M")
    );

    let store = Arc::new(InMemoryStore::with_demo_data().await);
    let sessions = SessionRegistry::new(config.session_idle_timeout);
    let _prune_handle = booking::spawn_prune_task(sessions.clone());

    let port = config.port;
    let state = BookingRouteState {
        workflow: Arc::new(BookingWorkflow::new(store, config)),
        sessions,
    };

    let app = booking::booking_routes(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "Booking server started");
    axum::serve(listener, app).await?;

    Ok(())
}
