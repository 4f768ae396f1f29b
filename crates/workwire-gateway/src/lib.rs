// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Workwire realtime core.
//!
//! One axum server carries three surfaces over the same service layer:
//! the authenticated REST routes, the chat push channel (`/ws`), and the
//! room signaling channel (`/rtc`). The services in [`server::AppState`]
//! are the single source of truth -- the transports never hold their own
//! copy of conversation, call, or room state.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rtc;
pub mod server;
pub mod ws;

pub use error::ApiError;
pub use server::{AppState, GatewayConfig, build_router, start_server};
