//! Room Controller
//!
//! Stateful WebSocket broadcast server for real-time room event streams.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Connect to Redis (durable room state)
//! 4. Build the connection gateway and room supervisor
//! 5. Serve HTTP: room routes + health + metrics on one listener
//! 6. Wait for shutdown signal, then drain room actors

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use common::secret::ExposeSecret;
use metrics_exporter_prometheus::PrometheusBuilder;
use room_controller::actors::{RoomSettings, RoomSupervisor};
use room_controller::config::Config;
use room_controller::connections::{ConnectionDirectory, ConnectionGateway};
use room_controller::observability::{health_router, HealthState};
use room_controller::routes::{build_routes, AppState};
use room_controller::storage::RedisRoomStore;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Deadline for draining room actors at shutdown.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_controller=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Room Controller");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        http_bind_address = %config.http_bind_address,
        passivate_after_seconds = config.passivate_after_seconds,
        max_content_bytes = config.max_content_bytes,
        outbound_queue_capacity = config.outbound_queue_capacity,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    let prometheus_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        format!("Failed to install Prometheus metrics recorder: {e}")
    })?;

    // Initialize health state
    let health_state = Arc::new(HealthState::new());

    // Connect to Redis
    info!("Connecting to Redis...");
    let store = RedisRoomStore::new(config.redis_url.expose_secret())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to Redis");
            e
        })?;
    info!("Redis connection established");

    // Build the connection gateway and room supervisor
    let gateway: Arc<dyn ConnectionDirectory> = Arc::new(ConnectionGateway::new());
    let supervisor = Arc::new(RoomSupervisor::new(
        Arc::new(store),
        Arc::clone(&gateway),
        RoomSettings {
            passivate_after: Duration::from_secs(config.passivate_after_seconds),
            max_content_bytes: config.max_content_bytes,
        },
    ));

    let state = AppState {
        supervisor: Arc::clone(&supervisor),
        directory: gateway,
        outbound_queue_capacity: config.outbound_queue_capacity,
    };

    // Add /metrics endpoint served by the Prometheus exporter
    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );

    let app = build_routes(state)
        .merge(health_router(Arc::clone(&health_state)))
        .merge(metrics_router);

    let addr: SocketAddr = config.http_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.http_bind_address, "Invalid HTTP bind address");
        format!("Invalid HTTP bind address: {e}")
    })?;

    // Bind listener BEFORE serving to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind HTTP server");
        format!("Failed to bind HTTP server to {addr}: {e}")
    })?;
    info!(addr = %addr, "HTTP server bound successfully");

    // Redis is connected and the listener is up: ready to serve
    health_state.set_ready();

    // Child of the supervisor's root token: cancelled by supervisor.shutdown()
    let server_token = supervisor.child_token();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_token.cancelled().await;
        info!("HTTP server shutting down");
    });

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server failed");
        }
    });
    info!(addr = %addr, "Room Controller running - press Ctrl+C to shutdown");

    // Wait for shutdown signal
    shutdown_signal().await;
    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so load balancers stop sending traffic
    health_state.set_not_ready();

    // Drain room actors (also cancels the HTTP server via the token tree)
    supervisor.shutdown(SHUTDOWN_DEADLINE).await;

    let _ = server_task.await;

    info!("Room Controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
