// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication middleware for the REST routes.
//!
//! Extracts `Authorization: Bearer <token>`, verifies it with the shared
//! [`workwire_auth::JwtAuthenticator`], and injects the verified
//! [`Identity`] into request extensions. Fail-closed: no token, no
//! request.
//!
//! The push channels do not use this middleware -- they authenticate
//! during the WebSocket handshake, before any channel join.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use workwire_core::{Identity, WireError};

use crate::error::ApiError;
use crate::server::AppState;

/// Validate the bearer token and attach the verified identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError(WireError::Auth("user is not authenticated".to_string())))?;

    let identity: Identity = state.auth.authenticate_token(token).map_err(ApiError)?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}
