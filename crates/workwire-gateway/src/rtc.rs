// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The room signaling channel (`GET /rtc`).
//!
//! Carries the meeting-room envelope (`join-room`, `webrtc-offer`, ...)
//! and nothing else. Authentication happens at the handshake, exactly as
//! on the chat channel. The server acknowledges the upgrade with a
//! `connected` frame before any other traffic.
//!
//! All room semantics live in [`workwire_signaling::RoomManager`]; this
//! handler only decodes frames and hands them over, and reports an
//! unclean close as a disconnect so the room is never left with a dead
//! member.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};

use workwire_core::events::{RoomClientEvent, RoomServerEvent};
use workwire_core::types::Identity;
use workwire_signaling::SignalKind;

use crate::error::ApiError;
use crate::server::AppState;
use crate::ws::WsAuthQuery;

/// WebSocket upgrade handler for the room signaling channel.
pub async fn rtc_handler(
    ws: WebSocketUpgrade,
    Query(auth): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> Response {
    let identity = match state.auth.verify_token(&auth.token, &auth.user_id) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(user_id = %auth.user_id, error = %e, "rtc handshake refused");
            return ApiError(e).into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let conn_id = uuid::Uuid::new_v4().to_string();

    let mut outbound = state.bus.register(&conn_id, &identity.user_id);

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Immediate ack so clients know the channel is live.
    if let Some(sender) = state.bus.sender_of(&conn_id) {
        let _ = sender.try_send(RoomServerEvent::Connected.to_frame());
    }

    tracing::info!(user_id = %identity.user_id, "rtc channel connected");

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let event: RoomClientEvent = match serde_json::from_str(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "rejecting unknown rtc frame");
                        if let Some(sender) = state.bus.sender_of(&conn_id) {
                            let _ = sender.try_send(
                                RoomServerEvent::Error {
                                    message: format!("unrecognized event: {e}"),
                                }
                                .to_frame(),
                            );
                        }
                        continue;
                    }
                };
                dispatch(&state, &conn_id, event);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Treat any close like an explicit leave for whatever room the
    // connection was in.
    state.rooms.disconnect(&conn_id);
    state.bus.unregister(&conn_id);
    sender_task.abort();
    tracing::info!(user_id = %identity.user_id, "rtc channel disconnected");
}

fn dispatch(state: &AppState, conn_id: &str, event: RoomClientEvent) {
    match event {
        RoomClientEvent::JoinRoom {
            meeting_id,
            participant_id,
            participant_name,
            camera_enabled,
            mic_enabled,
        } => {
            state.rooms.join_room(
                conn_id,
                &meeting_id,
                &participant_id,
                &participant_name,
                camera_enabled,
                mic_enabled,
            );
        }
        RoomClientEvent::LeaveRoom {
            meeting_id,
            participant_id,
        } => {
            state.rooms.leave_room(&meeting_id, &participant_id);
        }
        RoomClientEvent::WebrtcOffer {
            meeting_id,
            target_id,
            payload,
        } => {
            state
                .rooms
                .relay(conn_id, &meeting_id, &target_id, SignalKind::Offer, payload);
        }
        RoomClientEvent::WebrtcAnswer {
            meeting_id,
            target_id,
            payload,
        } => {
            state
                .rooms
                .relay(conn_id, &meeting_id, &target_id, SignalKind::Answer, payload);
        }
        RoomClientEvent::WebrtcIceCandidate {
            meeting_id,
            target_id,
            payload,
        } => {
            state.rooms.relay(
                conn_id,
                &meeting_id,
                &target_id,
                SignalKind::IceCandidate,
                payload,
            );
        }
        RoomClientEvent::MediaStateChange {
            meeting_id,
            camera_enabled,
            mic_enabled,
        } => {
            state
                .rooms
                .media_state_change(conn_id, &meeting_id, camera_enabled, mic_enabled);
        }
        RoomClientEvent::SharedScreen {
            meeting_id,
            screen_enabled,
        } => {
            state.rooms.shared_screen(conn_id, &meeting_id, screen_enabled);
        }
    }
}
