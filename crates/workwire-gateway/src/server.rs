// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. Both transports -- the
//! REST routes and the push channels -- call the same services held in
//! [`AppState`]; neither owns any state of its own.

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};

use workwire_auth::JwtAuthenticator;
use workwire_bus::Broadcaster;
use workwire_calls::CallService;
use workwire_chat::ChatService;
use workwire_core::WireError;
use workwire_signaling::RoomManager;

use crate::auth::auth_middleware;
use crate::handlers;
use crate::rtc;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<JwtAuthenticator>,
    pub bus: Arc<Broadcaster>,
    pub chat: Arc<ChatService>,
    pub calls: Arc<CallService>,
    pub rooms: Arc<RoomManager>,
    /// Process start time for the health endpoint.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors `ServerConfig` from
/// workwire-config).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Allowed browser origin for CORS; `None` allows any origin.
    pub frontend_origin: Option<String>,
}

/// Build the full application router over the shared state.
pub fn build_router(state: AppState, frontend_origin: Option<&str>) -> Router {
    // Unauthenticated liveness endpoint.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    // REST routes requiring bearer authentication.
    let api_routes = Router::new()
        .route("/api/v1/calls", post(handlers::create_call))
        .route("/api/v1/calls/active", get(handlers::active_calls))
        .route("/api/v1/calls/{conversation_id}/join", post(handlers::join_call))
        .route("/api/v1/calls/{conversation_id}/end", post(handlers::end_call))
        .route(
            "/api/v1/calls/{conversation_id}/status",
            get(handlers::call_status),
        )
        .route(
            "/api/v1/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/messages",
            get(handlers::get_messages),
        )
        .route(
            "/api/v1/conversations/{conversation_id}/read",
            put(handlers::mark_as_read),
        )
        .route("/api/v1/messages", post(handlers::send_message))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    // Push channels (auth happens during the handshake, not via middleware).
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/rtc", get(rtc::rtc_handler))
        .with_state(state);

    let cors = match frontend_origin {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin, "invalid frontend origin, allowing any");
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    };

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(cors)
}

/// Start the gateway HTTP/WebSocket server and serve until the process
/// exits.
pub async fn start_server(config: &GatewayConfig, state: AppState) -> Result<(), WireError> {
    let app = build_router(state, config.frontend_origin.as_deref());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WireError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| WireError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
