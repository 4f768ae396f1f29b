// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the REST API.
//!
//! Every handler receives the verified [`Identity`] injected by the auth
//! middleware and delegates to the services in [`AppState`]. Response
//! bodies keep the `{success, ...}` shape deployed clients expect.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use workwire_calls::CreateOutcome;
use workwire_chat::Opened;
use workwire_core::WireError;
use workwire_core::types::{
    CallSession, CallType, ChatMessage, Conversation, Identity, MessageKind, Role,
};

use crate::error::ApiError;
use crate::server::AppState;

// --- Request bodies ---

/// Request body for POST /api/v1/calls.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    pub conversation_id: String,
    pub call_type: CallType,
}

/// Request body for POST /api/v1/conversations.
///
/// A client supplies `worker_id`; a worker supplies `client_id`. The
/// missing side is the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub job_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub worker_id: Option<String>,
}

/// Request body for POST /api/v1/messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
}

// --- Response bodies ---

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub success: bool,
    pub call: CallSession,
}

#[derive(Debug, Serialize)]
pub struct CallStatusResponse {
    pub success: bool,
    pub call: Option<CallSession>,
}

#[derive(Debug, Serialize)]
pub struct CallListResponse {
    pub success: bool,
    pub calls: Vec<CallSession>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub success: bool,
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub success: bool,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct StatusMessageResponse {
    pub success: bool,
    pub message: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// --- Call routes ---

/// POST /api/v1/calls
///
/// 201 on a fresh session; 200 with the live session when one already
/// exists (join-by-creation semantics, never a conflict error).
pub async fn create_call(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateCallRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .calls
        .create(&identity, &body.conversation_id, body.call_type)
        .await?;
    let response = match outcome {
        CreateOutcome::New(call) => (
            StatusCode::CREATED,
            Json(CallResponse {
                success: true,
                call,
            }),
        ),
        CreateOutcome::Existing(call) => (
            StatusCode::OK,
            Json(CallResponse {
                success: true,
                call,
            }),
        ),
    };
    Ok(response.into_response())
}

/// POST /api/v1/calls/{conversation_id}/join
pub async fn join_call(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
) -> Result<Json<CallResponse>, ApiError> {
    let call = state.calls.join(&identity, &conversation_id).await?;
    Ok(Json(CallResponse {
        success: true,
        call,
    }))
}

/// POST /api/v1/calls/{conversation_id}/end
pub async fn end_call(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
) -> Result<Json<CallResponse>, ApiError> {
    let call = state.calls.end(&identity, &conversation_id).await?;
    Ok(Json(CallResponse {
        success: true,
        call,
    }))
}

/// GET /api/v1/calls/{conversation_id}/status
///
/// `call` is null when no call is live -- a normal state, not an error.
pub async fn call_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
) -> Result<Json<CallStatusResponse>, ApiError> {
    let call = state.calls.status(&identity, &conversation_id).await?;
    Ok(Json(CallStatusResponse {
        success: true,
        call,
    }))
}

/// GET /api/v1/calls/active
pub async fn active_calls(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Json<CallListResponse> {
    Json(CallListResponse {
        success: true,
        calls: state.calls.active_for_user(&identity.user_id),
    })
}

// --- Conversation/message routes ---

/// GET /api/v1/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let conversations = state.chat.list_conversations(&identity).await?;
    Ok(Json(ConversationListResponse {
        success: true,
        conversations,
    }))
}

/// POST /api/v1/conversations
///
/// 201 on creation, 200 when the (job, client, worker) conversation
/// already exists.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CreateConversationRequest>,
) -> Result<Response, ApiError> {
    let (client_id, worker_id) = match identity.role {
        Role::Client => (
            identity.user_id.as_str(),
            body.worker_id
                .as_deref()
                .ok_or_else(|| WireError::Validation("workerId is required".to_string()))?,
        ),
        Role::Worker => (
            body.client_id
                .as_deref()
                .ok_or_else(|| WireError::Validation("clientId is required".to_string()))?,
            identity.user_id.as_str(),
        ),
    };

    let opened = state
        .chat
        .open_conversation(&identity, &body.job_id, client_id, worker_id)
        .await?;
    let response = match opened {
        Opened::Created(conversation) => (
            StatusCode::CREATED,
            Json(ConversationResponse {
                success: true,
                conversation,
            }),
        ),
        Opened::Existing(conversation) => (
            StatusCode::OK,
            Json(ConversationResponse {
                success: true,
                conversation,
            }),
        ),
    };
    Ok(response.into_response())
}

/// GET /api/v1/conversations/{conversation_id}/messages
///
/// Side effect: messages addressed to the caller are marked read and the
/// counterpart receives a read receipt.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let messages = state.chat.fetch_messages(&identity, &conversation_id).await?;
    Ok(Json(MessageListResponse {
        success: true,
        messages,
    }))
}

/// PUT /api/v1/conversations/{conversation_id}/read
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(conversation_id): Path<String>,
) -> Result<Json<StatusMessageResponse>, ApiError> {
    state.chat.mark_read(&identity, &conversation_id).await?;
    Ok(Json(StatusMessageResponse {
        success: true,
        message: "Messages marked as read".to_string(),
    }))
}

/// POST /api/v1/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    let message = state
        .chat
        .send_message(&identity, &body.conversation_id, &body.content, body.kind)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message,
        }),
    )
        .into_response())
}

// --- Health ---

/// GET /health (unauthenticated liveness)
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
