//! Relay server setup
//!
//! Provides the HTTP/WebSocket routes and the server entry point.

mod handler;
mod relay;
mod state;

pub use handler::{gateway_handler, online_users, ConnectParams};
pub use relay::Relay;
pub use state::GatewayState;

use axum::{routing::get, Router};
use relay_common::{AppError, RelayConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the relay router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws", get(gateway_handler))
        .route("/users", get(online_users))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve an application on an already bound listener
pub async fn serve(listener: TcpListener, app: Router) -> Result<(), AppError> {
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}

/// Run the relay server
pub async fn run_server(app: Router, addr: &str) -> Result<(), AppError> {
    tracing::info!("Starting relay server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::bind(addr, e))?;

    tracing::info!("Relay listening on ws://{}/ws", addr);

    serve(listener, app).await
}

/// Run the complete relay server with configuration
pub async fn run(config: RelayConfig) -> Result<(), AppError> {
    let addr = config.server.address();

    tracing::info!(
        outbound_queue_capacity = config.relay.outbound_queue_capacity,
        "Relay configured"
    );

    let app = create_app(GatewayState::new(&config.relay));

    run_server(app, &addr).await
}
