// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service wiring for `workwire serve`.
//!
//! Builds the stack bottom-up -- storage, broadcaster, services, gateway
//! -- and serves until the process exits. The in-memory registries (calls,
//! rooms) start from a clean slate on every boot by design.

use std::sync::Arc;

use workwire_auth::JwtAuthenticator;
use workwire_bus::Broadcaster;
use workwire_calls::CallService;
use workwire_chat::ChatService;
use workwire_config::WorkwireConfig;
use workwire_core::{StorageAdapter, WireError};
use workwire_gateway::{AppState, GatewayConfig, start_server};
use workwire_signaling::RoomManager;
use workwire_storage::SqliteStore;

/// Run the realtime server with the given configuration.
pub async fn run(config: WorkwireConfig) -> Result<(), WireError> {
    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| WireError::Config("auth.jwt_secret is required".to_string()))?;

    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(store);

    let bus = Arc::new(Broadcaster::new());
    let chat = Arc::new(ChatService::new(Arc::clone(&storage), Arc::clone(&bus)));
    let calls = Arc::new(CallService::new(Arc::clone(&storage), Arc::clone(&bus)));
    let rooms = Arc::new(RoomManager::new(Arc::clone(&bus)));
    let auth = Arc::new(JwtAuthenticator::new(secret));

    tracing::info!(
        db = %config.storage.database_path,
        "workwire services initialized"
    );

    let state = AppState {
        auth,
        bus,
        chat,
        calls,
        rooms,
        start_time: std::time::Instant::now(),
    };

    let gateway_config = GatewayConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        frontend_origin: config.server.frontend_origin.clone(),
    };

    start_server(&gateway_config, state).await
}
