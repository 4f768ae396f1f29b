// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire envelopes for the two push channels.
//!
//! Every frame is a JSON object with a `type` tag and camelCase payload
//! fields, matching what deployed clients already speak. The enums are
//! closed: a frame with an unknown tag fails deserialization and is
//! answered with an `error` frame rather than falling through silently.
//!
//! The chat channel (`/ws`) uses snake_case tags (`join_conversation`,
//! `new_message`, ...). The room signaling channel (`/rtc`) uses
//! kebab-case tags (`join-room`, `webrtc-offer`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CallType, ChatMessage, MessageKind};

// --- Chat channel: client -> server ---

/// Frames a client may send on the chat channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinConversation {
        conversation_id: String,
    },
    LeaveConversation {
        conversation_id: String,
    },
    /// Acked with an [`ServerEvent::Ack`] frame carrying success or error.
    SendMessage {
        conversation_id: String,
        content: String,
        #[serde(default)]
        kind: MessageKind,
    },
    TypingStart {
        conversation_id: String,
    },
    TypingStop {
        conversation_id: String,
    },
    MarkAsRead {
        conversation_id: String,
    },
    SetOnlineStatus {
        status: String,
    },
    /// Joins the live call for the conversation; the registry is the
    /// source of truth, the broadcast is derived from it.
    CallAccepted {
        conversation_id: String,
        call_id: String,
    },
    /// Advisory relay only; a rejected call keeps ringing in the registry
    /// until ended.
    CallRejected {
        conversation_id: String,
        call_id: String,
    },
    /// Ends the live call for the conversation via the registry.
    CallEnded {
        conversation_id: String,
        call_id: String,
    },
    Offer {
        conversation_id: String,
        target_user_id: String,
        offer: Value,
    },
    Answer {
        conversation_id: String,
        target_user_id: String,
        answer: Value,
    },
    IceCandidate {
        conversation_id: String,
        target_user_id: String,
        candidate: Value,
    },
}

// --- Chat channel: server -> client ---

/// Frames the server pushes on the chat channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    NewMessage {
        conversation_id: String,
        message: ChatMessage,
    },
    /// Delivered to the receiver's personal channel regardless of which
    /// conversation they are currently viewing.
    MessageNotification {
        conversation_id: String,
        message: ChatMessage,
        sender: String,
    },
    UserTyping {
        conversation_id: String,
        user_id: String,
    },
    UserStoppedTyping {
        conversation_id: String,
        user_id: String,
    },
    MessagesRead {
        conversation_id: String,
        user_id: String,
    },
    UserStatusChanged {
        user_id: String,
        status: String,
    },
    CallIncoming {
        conversation_id: String,
        call_id: String,
        call_type: CallType,
        caller_id: String,
    },
    CallAccepted {
        conversation_id: String,
        call_id: String,
    },
    CallRejected {
        conversation_id: String,
        call_id: String,
    },
    CallEnded {
        conversation_id: String,
        call_id: String,
    },
    Offer {
        conversation_id: String,
        offer: Value,
        from_user_id: String,
    },
    Answer {
        conversation_id: String,
        answer: Value,
        from_user_id: String,
    },
    IceCandidate {
        conversation_id: String,
        candidate: Value,
        from_user_id: String,
    },
    /// Completion reply for frames that expect one (`send_message`).
    Ack {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Serialize to the JSON text sent over the socket.
    ///
    /// Serialization of these enums cannot fail; the fallback covers the
    /// trait contract without panicking.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","message":"serialization failed"}"#.to_string())
    }
}

// --- Room signaling channel: client -> server ---

/// Frames a client may send on the room signaling channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RoomClientEvent {
    JoinRoom {
        meeting_id: String,
        participant_id: String,
        participant_name: String,
        camera_enabled: bool,
        mic_enabled: bool,
    },
    WebrtcOffer {
        meeting_id: String,
        target_id: String,
        payload: Value,
    },
    WebrtcAnswer {
        meeting_id: String,
        target_id: String,
        payload: Value,
    },
    WebrtcIceCandidate {
        meeting_id: String,
        target_id: String,
        payload: Value,
    },
    LeaveRoom {
        meeting_id: String,
        participant_id: String,
    },
    MediaStateChange {
        meeting_id: String,
        camera_enabled: bool,
        mic_enabled: bool,
    },
    SharedScreen {
        meeting_id: String,
        screen_enabled: bool,
    },
}

/// A room member as reported to other members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: String,
    pub name: String,
    pub camera_enabled: bool,
    pub mic_enabled: bool,
}

// --- Room signaling channel: server -> client ---

/// Frames the server pushes on the room signaling channel.
///
/// `shared-screen-toogle` keeps the wire spelling deployed clients expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum RoomServerEvent {
    /// Sent once, immediately after the socket upgrades.
    Connected,
    ParticipantJoined {
        participant: ParticipantInfo,
    },
    /// Full current member list, sent to a joiner so join order never
    /// causes a missed participant.
    RoomParticipants {
        participants: Vec<ParticipantInfo>,
    },
    ParticipantLeft {
        participant_id: String,
    },
    ParticipantMediaChange {
        participant_id: String,
        camera_enabled: bool,
        mic_enabled: bool,
    },
    WebrtcOffer {
        from_id: String,
        payload: Value,
    },
    WebrtcAnswer {
        from_id: String,
        payload: Value,
    },
    WebrtcIceCandidate {
        from_id: String,
        payload: Value,
    },
    #[serde(rename = "shared-screen-toogle")]
    SharedScreenToggle {
        participant_id: String,
        screen_enabled: bool,
    },
    Error {
        message: String,
    },
}

impl RoomServerEvent {
    /// Serialize to the JSON text sent over the socket.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"error","message":"serialization failed"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_parses_snake_tag_camel_fields() {
        let json = r#"{"type":"send_message","conversationId":"conv-1","content":"Hi"}"#;
        let ev: ClientEvent = serde_json::from_str(json).unwrap();
        match ev {
            ClientEvent::SendMessage {
                conversation_id,
                content,
                kind,
            } => {
                assert_eq!(conversation_id, "conv-1");
                assert_eq!(content, "Hi");
                assert_eq!(kind, MessageKind::Text);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_chat_tag_is_rejected() {
        let json = r#"{"type":"drop_tables","conversationId":"conv-1"}"#;
        assert!(serde_json::from_str::<ClientEvent>(json).is_err());
    }

    #[test]
    fn server_event_frame_has_type_tag() {
        let frame = ServerEvent::UserTyping {
            conversation_id: "conv-1".into(),
            user_id: "u1".into(),
        }
        .to_frame();
        assert!(frame.contains("\"type\":\"user_typing\""));
        assert!(frame.contains("\"conversationId\":\"conv-1\""));
    }

    #[test]
    fn ack_omits_empty_fields() {
        let frame = ServerEvent::Ack {
            ok: true,
            message_id: Some("m1".into()),
            error: None,
        }
        .to_frame();
        assert!(frame.contains("\"messageId\":\"m1\""));
        assert!(!frame.contains("error"));
    }

    #[test]
    fn room_event_parses_kebab_tag() {
        let json = r#"{
            "type": "join-room",
            "meetingId": "m1",
            "participantId": "p1",
            "participantName": "Ada",
            "cameraEnabled": true,
            "micEnabled": false
        }"#;
        let ev: RoomClientEvent = serde_json::from_str(json).unwrap();
        match ev {
            RoomClientEvent::JoinRoom {
                meeting_id,
                participant_id,
                camera_enabled,
                mic_enabled,
                ..
            } => {
                assert_eq!(meeting_id, "m1");
                assert_eq!(participant_id, "p1");
                assert!(camera_enabled);
                assert!(!mic_enabled);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn shared_screen_toggle_keeps_wire_spelling() {
        let frame = RoomServerEvent::SharedScreenToggle {
            participant_id: "p1".into(),
            screen_enabled: true,
        }
        .to_frame();
        assert!(frame.contains("\"type\":\"shared-screen-toogle\""));
        assert!(frame.contains("\"screenEnabled\":true"));
    }

    #[test]
    fn connected_frame_is_bare() {
        assert_eq!(
            RoomServerEvent::Connected.to_frame(),
            r#"{"type":"connected"}"#
        );
    }

    #[test]
    fn unknown_room_tag_is_rejected() {
        let json = r#"{"type":"join_room","meetingId":"m1"}"#;
        assert!(serde_json::from_str::<RoomClientEvent>(json).is_err());
    }
}
