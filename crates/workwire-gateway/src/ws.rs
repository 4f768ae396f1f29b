// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat push channel (`GET /ws`).
//!
//! Authentication happens during the handshake: the client presents
//! `?token=<jwt>&userId=<id>` and the connection is refused before any
//! channel join when the pair does not verify. On success the connection
//! is registered with the broadcaster, which joins the user's personal
//! channel automatically.
//!
//! Frames are the closed [`ClientEvent`] set; anything else is answered
//! with an `error` frame. `send_message` is acknowledged with an `ack`
//! frame carrying the new message id or the failure.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use workwire_core::events::{ClientEvent, ServerEvent};
use workwire_core::types::Identity;

use crate::error::ApiError;
use crate::server::AppState;

/// Handshake query parameters.
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "userId")]
    pub user_id: String,
}

/// WebSocket upgrade handler for the chat channel.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(auth): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> Response {
    let identity = match state.auth.verify_token(&auth.token, &auth.user_id) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(user_id = %auth.user_id, error = %e, "chat handshake refused");
            return ApiError(e).into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Push a frame directly to one connection, best-effort.
fn push(state: &AppState, conn_id: &str, event: &ServerEvent) {
    if let Some(sender) = state.bus.sender_of(conn_id) {
        let _ = sender.try_send(event.to_frame());
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let conn_id = uuid::Uuid::new_v4().to_string();

    // Register with the fan-out bus; this joins the personal channel.
    let mut outbound = state.bus.register(&conn_id, &identity.user_id);

    // Sender task: forwards bus frames to the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!(
        user_id = %identity.user_id,
        role = %identity.role,
        "chat channel connected"
    );

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let event: ClientEvent = match serde_json::from_str(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "rejecting unknown chat frame");
                        push(
                            &state,
                            &conn_id,
                            &ServerEvent::Error {
                                message: format!("unrecognized event: {e}"),
                            },
                        );
                        continue;
                    }
                };
                dispatch(&state, &conn_id, &identity, event).await;
            }
            Message::Close(_) => break,
            _ => {} // Binary and ping/pong are ignored.
        }
    }

    // Unclean or clean close: one cleanup path.
    state.bus.unregister(&conn_id);
    state.rooms.disconnect(&conn_id);
    sender_task.abort();
    tracing::info!(user_id = %identity.user_id, "chat channel disconnected");
}

async fn dispatch(state: &AppState, conn_id: &str, identity: &Identity, event: ClientEvent) {
    match event {
        ClientEvent::JoinConversation { conversation_id } => {
            match state.chat.authorize_member(identity, &conversation_id).await {
                Ok(()) => {
                    state.bus.join(conn_id, &conversation_id);
                    tracing::debug!(
                        user_id = %identity.user_id,
                        conversation_id = %conversation_id,
                        "joined conversation channel"
                    );
                }
                Err(e) => push(
                    state,
                    conn_id,
                    &ServerEvent::Error {
                        message: e.to_string(),
                    },
                ),
            }
        }
        ClientEvent::LeaveConversation { conversation_id } => {
            state.bus.leave(conn_id, &conversation_id);
        }
        ClientEvent::SendMessage {
            conversation_id,
            content,
            kind,
        } => {
            let ack = match state
                .chat
                .send_message(identity, &conversation_id, &content, kind)
                .await
            {
                Ok(message) => ServerEvent::Ack {
                    ok: true,
                    message_id: Some(message.id),
                    error: None,
                },
                Err(e) => ServerEvent::Ack {
                    ok: false,
                    message_id: None,
                    error: Some(e.to_string()),
                },
            };
            push(state, conn_id, &ack);
        }
        ClientEvent::TypingStart { conversation_id } => {
            state.bus.send_to_channel_except(
                &conversation_id,
                conn_id,
                &ServerEvent::UserTyping {
                    conversation_id: conversation_id.clone(),
                    user_id: identity.user_id.clone(),
                }
                .to_frame(),
            );
        }
        ClientEvent::TypingStop { conversation_id } => {
            state.bus.send_to_channel_except(
                &conversation_id,
                conn_id,
                &ServerEvent::UserStoppedTyping {
                    conversation_id: conversation_id.clone(),
                    user_id: identity.user_id.clone(),
                }
                .to_frame(),
            );
        }
        ClientEvent::MarkAsRead { conversation_id } => {
            if let Err(e) = state.chat.mark_read(identity, &conversation_id).await {
                push(
                    state,
                    conn_id,
                    &ServerEvent::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        ClientEvent::SetOnlineStatus { status } => {
            state.bus.broadcast_except(
                conn_id,
                &ServerEvent::UserStatusChanged {
                    user_id: identity.user_id.clone(),
                    status,
                }
                .to_frame(),
            );
        }
        // The registry is the source of truth for accept/end; the
        // broadcast is emitted by the call service after the write.
        ClientEvent::CallAccepted {
            conversation_id, ..
        } => {
            if let Err(e) = state.calls.join(identity, &conversation_id).await {
                push(
                    state,
                    conn_id,
                    &ServerEvent::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        ClientEvent::CallEnded {
            conversation_id, ..
        } => {
            if let Err(e) = state.calls.end(identity, &conversation_id).await {
                push(
                    state,
                    conn_id,
                    &ServerEvent::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        // Reject is advisory only: the session keeps ringing in the
        // registry until explicitly ended.
        ClientEvent::CallRejected {
            conversation_id,
            call_id,
        } => {
            state.bus.send_to_channel_except(
                &conversation_id,
                conn_id,
                &ServerEvent::CallRejected {
                    conversation_id: conversation_id.clone(),
                    call_id,
                }
                .to_frame(),
            );
        }
        ClientEvent::Offer {
            conversation_id,
            target_user_id,
            offer,
        } => {
            state.bus.send_to_user(
                &target_user_id,
                &ServerEvent::Offer {
                    conversation_id,
                    offer,
                    from_user_id: identity.user_id.clone(),
                }
                .to_frame(),
            );
        }
        ClientEvent::Answer {
            conversation_id,
            target_user_id,
            answer,
        } => {
            state.bus.send_to_user(
                &target_user_id,
                &ServerEvent::Answer {
                    conversation_id,
                    answer,
                    from_user_id: identity.user_id.clone(),
                }
                .to_frame(),
            );
        }
        ClientEvent::IceCandidate {
            conversation_id,
            target_user_id,
            candidate,
        } => {
            state.bus.send_to_user(
                &target_user_id,
                &ServerEvent::IceCandidate {
                    conversation_id,
                    candidate,
                    from_user_id: identity.user_id.clone(),
                }
                .to_frame(),
            );
        }
    }
}
