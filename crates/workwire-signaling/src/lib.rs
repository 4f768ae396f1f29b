// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signaling room manager for WebRTC negotiation.
//!
//! Rooms are keyed by a meeting id and hold participants keyed by
//! participant id (not connection id, so a participant can reconnect and
//! take over their slot). A room is created on first join and destroyed
//! the instant its member set empties -- rooms never linger.
//!
//! Relay semantics are fire-and-forget: a payload addressed to an absent
//! participant is silently dropped, never queued or retried.
//!
//! One cleanup path: explicit `leave-room`, joining a different room, and
//! an unclean disconnect all run [`RoomManager::remove_participant`].

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info, trace};

use workwire_bus::Broadcaster;
use workwire_core::events::{ParticipantInfo, RoomServerEvent};

/// Kinds of negotiation payload the relay forwards verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// One member of a room.
#[derive(Debug, Clone)]
struct Participant {
    id: String,
    name: String,
    camera_enabled: bool,
    mic_enabled: bool,
    /// The connection currently bound to this participant.
    conn_id: String,
}

impl Participant {
    fn info(&self) -> ParticipantInfo {
        ParticipantInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            camera_enabled: self.camera_enabled,
            mic_enabled: self.mic_enabled,
        }
    }
}

/// Membership set of one meeting, in join order.
#[derive(Debug, Default)]
struct Room {
    participants: Vec<Participant>,
}

impl Room {
    fn find(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    fn find_mut(&mut self, participant_id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == participant_id)
    }

    fn find_by_conn(&self, conn_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.conn_id == conn_id)
    }
}

/// Process-wide signaling room registry.
pub struct RoomManager {
    rooms: DashMap<String, Room>,
    /// Connection id -> (meeting id, participant id). A connection belongs
    /// to at most one room at a time.
    bindings: DashMap<String, (String, String)>,
    bus: Arc<Broadcaster>,
}

impl RoomManager {
    pub fn new(bus: Arc<Broadcaster>) -> Self {
        Self {
            rooms: DashMap::new(),
            bindings: DashMap::new(),
            bus,
        }
    }

    /// Join (or create) a room.
    ///
    /// Everyone already present learns about the joiner via
    /// `participant-joined`; the joiner gets `room-participants` with the
    /// full current member list, so join order never causes a missed
    /// participant. Rejoining under the same participant id rebinds the
    /// slot to the new connection.
    pub fn join_room(
        &self,
        conn_id: &str,
        meeting_id: &str,
        participant_id: &str,
        participant_name: &str,
        camera_enabled: bool,
        mic_enabled: bool,
    ) {
        // A connection may sit in one room only; switching rooms leaves
        // the previous one through the normal path.
        if let Some(binding) = self.bindings.get(conn_id) {
            let (bound_meeting, bound_participant) = binding.clone();
            drop(binding);
            if bound_meeting != meeting_id || bound_participant != participant_id {
                self.remove_participant(&bound_meeting, &bound_participant);
            }
        }

        let (others, stale_conn) = {
            let mut room = self.rooms.entry(meeting_id.to_string()).or_default();

            let stale_conn = match room.find_mut(participant_id) {
                // Reconnect: take over the slot, refresh flags.
                Some(existing) => {
                    let old_conn = existing.conn_id.clone();
                    existing.conn_id = conn_id.to_string();
                    existing.name = participant_name.to_string();
                    existing.camera_enabled = camera_enabled;
                    existing.mic_enabled = mic_enabled;
                    (old_conn != conn_id).then_some(old_conn)
                }
                None => {
                    room.participants.push(Participant {
                        id: participant_id.to_string(),
                        name: participant_name.to_string(),
                        camera_enabled,
                        mic_enabled,
                        conn_id: conn_id.to_string(),
                    });
                    None
                }
            };

            let others: Vec<ParticipantInfo> = room
                .participants
                .iter()
                .filter(|p| p.id != participant_id)
                .map(Participant::info)
                .collect();
            (others, stale_conn)
        };

        // The replaced connection no longer owns this slot; a late close on
        // it must not evict the reconnected participant.
        if let Some(stale) = stale_conn {
            self.bindings.remove(&stale);
        }

        self.bindings.insert(
            conn_id.to_string(),
            (meeting_id.to_string(), participant_id.to_string()),
        );

        info!(meeting_id, participant_id, "participant joined room");

        self.broadcast(
            meeting_id,
            Some(participant_id),
            &RoomServerEvent::ParticipantJoined {
                participant: ParticipantInfo {
                    id: participant_id.to_string(),
                    name: participant_name.to_string(),
                    camera_enabled,
                    mic_enabled,
                },
            }
            .to_frame(),
        );

        self.send_to_conn(
            conn_id,
            &RoomServerEvent::RoomParticipants {
                participants: others,
            }
            .to_frame(),
        );
    }

    /// Explicit leave. Remaining members get `participant-left`; an empty
    /// room is deleted.
    pub fn leave_room(&self, meeting_id: &str, participant_id: &str) {
        self.remove_participant(meeting_id, participant_id);
    }

    /// Forward a negotiation payload to the connection currently bound to
    /// the target participant, annotated with the sender's participant id.
    /// Dropped silently when the sender is not in the room or the target
    /// is absent.
    pub fn relay(
        &self,
        conn_id: &str,
        meeting_id: &str,
        target_id: &str,
        kind: SignalKind,
        payload: Value,
    ) {
        let (from_id, target_conn) = {
            let Some(room) = self.rooms.get(meeting_id) else {
                trace!(meeting_id, "relay dropped: no such room");
                return;
            };
            let Some(sender) = room.find_by_conn(conn_id) else {
                trace!(meeting_id, "relay dropped: sender not in room");
                return;
            };
            let Some(target) = room.find(target_id) else {
                trace!(meeting_id, target_id, "relay dropped: target absent");
                return;
            };
            (sender.id.clone(), target.conn_id.clone())
        };

        let event = match kind {
            SignalKind::Offer => RoomServerEvent::WebrtcOffer { from_id, payload },
            SignalKind::Answer => RoomServerEvent::WebrtcAnswer { from_id, payload },
            SignalKind::IceCandidate => RoomServerEvent::WebrtcIceCandidate { from_id, payload },
        };
        self.send_to_conn(&target_conn, &event.to_frame());
    }

    /// Record the sender's new media flags and broadcast them to every
    /// other member.
    pub fn media_state_change(
        &self,
        conn_id: &str,
        meeting_id: &str,
        camera_enabled: bool,
        mic_enabled: bool,
    ) {
        let participant_id = {
            let Some(mut room) = self.rooms.get_mut(meeting_id) else {
                return;
            };
            let Some(id) = room.find_by_conn(conn_id).map(|p| p.id.clone()) else {
                return;
            };
            if let Some(participant) = room.find_mut(&id) {
                participant.camera_enabled = camera_enabled;
                participant.mic_enabled = mic_enabled;
            }
            id
        };

        self.broadcast(
            meeting_id,
            Some(&participant_id),
            &RoomServerEvent::ParticipantMediaChange {
                participant_id: participant_id.clone(),
                camera_enabled,
                mic_enabled,
            }
            .to_frame(),
        );
    }

    /// Broadcast a screen-share toggle to every other member. The flag is
    /// not part of the room's stored media state.
    pub fn shared_screen(&self, conn_id: &str, meeting_id: &str, screen_enabled: bool) {
        let participant_id = {
            let Some(room) = self.rooms.get(meeting_id) else {
                return;
            };
            match room.find_by_conn(conn_id) {
                Some(p) => p.id.clone(),
                None => return,
            }
        };

        self.broadcast(
            meeting_id,
            Some(&participant_id),
            &RoomServerEvent::SharedScreenToggle {
                participant_id: participant_id.clone(),
                screen_enabled,
            }
            .to_frame(),
        );
    }

    /// Unclean disconnect: identical to an explicit leave for whatever
    /// room the connection was bound to. A connection whose slot was taken
    /// over by a reconnect no longer has a binding and removes nothing.
    pub fn disconnect(&self, conn_id: &str) {
        if let Some((_, (meeting_id, participant_id))) = self.bindings.remove(conn_id) {
            self.remove_participant(&meeting_id, &participant_id);
        }
    }

    /// Whether a room currently exists for the meeting id.
    pub fn room_exists(&self, meeting_id: &str) -> bool {
        self.rooms.contains_key(meeting_id)
    }

    /// Current member count of a room (zero if absent).
    pub fn member_count(&self, meeting_id: &str) -> usize {
        self.rooms
            .get(meeting_id)
            .map_or(0, |room| room.participants.len())
    }

    /// The single removal path behind leave, room-switch, and disconnect.
    fn remove_participant(&self, meeting_id: &str, participant_id: &str) {
        let removed_conn = {
            let Some(mut room) = self.rooms.get_mut(meeting_id) else {
                return;
            };
            let before = room.participants.len();
            let mut removed_conn = None;
            room.participants.retain(|p| {
                if p.id == participant_id {
                    removed_conn = Some(p.conn_id.clone());
                    false
                } else {
                    true
                }
            });
            if room.participants.len() == before {
                return;
            }
            removed_conn
        };

        if let Some(conn_id) = removed_conn {
            self.bindings.remove(&conn_id);
        }

        debug!(meeting_id, participant_id, "participant left room");

        self.broadcast(
            meeting_id,
            None,
            &RoomServerEvent::ParticipantLeft {
                participant_id: participant_id.to_string(),
            }
            .to_frame(),
        );

        self.rooms
            .remove_if(meeting_id, |_, room| room.participants.is_empty());
    }

    /// Push a frame to every room member except the named participant.
    fn broadcast(&self, meeting_id: &str, except_participant: Option<&str>, frame: &str) {
        let targets: Vec<String> = match self.rooms.get(meeting_id) {
            Some(room) => room
                .participants
                .iter()
                .filter(|p| except_participant != Some(p.id.as_str()))
                .map(|p| p.conn_id.clone())
                .collect(),
            None => return,
        };
        for conn_id in targets {
            self.send_to_conn(&conn_id, frame);
        }
    }

    fn send_to_conn(&self, conn_id: &str, frame: &str) {
        if let Some(sender) = self.bus.sender_of(conn_id)
            && sender.try_send(frame.to_string()).is_err()
        {
            trace!(conn_id, "dropping room frame for slow or closed connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use workwire_core::events::RoomServerEvent;

    struct TestConn {
        rx: mpsc::Receiver<String>,
    }

    impl TestConn {
        fn next(&mut self) -> Option<RoomServerEvent> {
            self.rx
                .try_recv()
                .ok()
                .map(|frame| serde_json::from_str(&frame).unwrap())
        }
    }

    fn setup() -> (RoomManager, Arc<Broadcaster>) {
        let bus = Arc::new(Broadcaster::new());
        (RoomManager::new(Arc::clone(&bus)), bus)
    }

    fn connect(bus: &Broadcaster, conn_id: &str, user_id: &str) -> TestConn {
        TestConn {
            rx: bus.register(conn_id, user_id),
        }
    }

    #[tokio::test]
    async fn first_joiner_gets_empty_participant_list() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");

        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);

        match p1.next() {
            Some(RoomServerEvent::RoomParticipants { participants }) => {
                assert!(participants.is_empty());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(rooms.room_exists("m1"));
        assert_eq!(rooms.member_count("m1"), 1);
    }

    #[tokio::test]
    async fn second_joiner_notifies_first_and_sees_them() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        let mut p2 = connect(&bus, "conn-2", "u2");

        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        p1.next(); // room-participants for p1

        rooms.join_room("conn-2", "m1", "p2", "Grace", false, true);

        match p1.next() {
            Some(RoomServerEvent::ParticipantJoined { participant }) => {
                assert_eq!(participant.id, "p2");
                assert_eq!(participant.name, "Grace");
                assert!(!participant.camera_enabled);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        match p2.next() {
            Some(RoomServerEvent::RoomParticipants { participants }) => {
                assert_eq!(participants.len(), 1);
                assert_eq!(participants[0].id, "p1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn leave_notifies_rest_and_empty_room_is_deleted() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        let mut p2 = connect(&bus, "conn-2", "u2");

        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        rooms.join_room("conn-2", "m1", "p2", "Grace", true, true);
        p1.next();
        p1.next();
        p2.next();

        rooms.leave_room("m1", "p2");
        match p1.next() {
            Some(RoomServerEvent::ParticipantLeft { participant_id }) => {
                assert_eq!(participant_id, "p2");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert_eq!(rooms.member_count("m1"), 1);

        rooms.leave_room("m1", "p1");
        assert!(!rooms.room_exists("m1"));

        // A fresh joiner starts from an empty list.
        let mut p3 = connect(&bus, "conn-3", "u3");
        rooms.join_room("conn-3", "m1", "p3", "Alan", true, true);
        match p3.next() {
            Some(RoomServerEvent::RoomParticipants { participants }) => {
                assert!(participants.is_empty());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn relay_reaches_target_with_sender_annotation() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        let mut p2 = connect(&bus, "conn-2", "u2");

        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        rooms.join_room("conn-2", "m1", "p2", "Grace", true, true);
        p1.next();
        p1.next();
        p2.next();

        let sdp = serde_json::json!({"sdp": "v=0...", "type": "offer"});
        rooms.relay("conn-1", "m1", "p2", SignalKind::Offer, sdp.clone());

        match p2.next() {
            Some(RoomServerEvent::WebrtcOffer { from_id, payload }) => {
                assert_eq!(from_id, "p1");
                assert_eq!(payload, sdp);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        // Nothing echoed to the sender.
        assert!(p1.next().is_none());
    }

    #[tokio::test]
    async fn relay_to_absent_target_is_silently_dropped() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        p1.next();

        rooms.relay(
            "conn-1",
            "m1",
            "ghost",
            SignalKind::IceCandidate,
            serde_json::json!({}),
        );
        rooms.relay(
            "conn-1",
            "no-room",
            "p1",
            SignalKind::Answer,
            serde_json::json!({}),
        );
        assert!(p1.next().is_none());
    }

    #[tokio::test]
    async fn media_change_updates_flags_seen_by_later_joiners() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        p1.next();

        rooms.media_state_change("conn-1", "m1", false, false);

        let mut p2 = connect(&bus, "conn-2", "u2");
        rooms.join_room("conn-2", "m1", "p2", "Grace", true, true);
        match p2.next() {
            Some(RoomServerEvent::RoomParticipants { participants }) => {
                assert_eq!(participants.len(), 1);
                assert!(!participants[0].camera_enabled);
                assert!(!participants[0].mic_enabled);
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        // And the change itself was broadcast to others (none at the time).
        rooms.media_state_change("conn-1", "m1", true, false);
        match p2.next() {
            Some(RoomServerEvent::ParticipantMediaChange {
                participant_id,
                camera_enabled,
                mic_enabled,
            }) => {
                assert_eq!(participant_id, "p1");
                assert!(camera_enabled);
                assert!(!mic_enabled);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shared_screen_broadcasts_toggle() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        let mut p2 = connect(&bus, "conn-2", "u2");
        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        rooms.join_room("conn-2", "m1", "p2", "Grace", true, true);
        p1.next();
        p1.next();
        p2.next();

        rooms.shared_screen("conn-2", "m1", true);
        match p1.next() {
            Some(RoomServerEvent::SharedScreenToggle {
                participant_id,
                screen_enabled,
            }) => {
                assert_eq!(participant_id, "p2");
                assert!(screen_enabled);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(p2.next().is_none());
    }

    #[tokio::test]
    async fn disconnect_runs_leave_path() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        let _p2 = connect(&bus, "conn-2", "u2");
        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        rooms.join_room("conn-2", "m1", "p2", "Grace", true, true);
        p1.next();
        p1.next();

        rooms.disconnect("conn-2");
        match p1.next() {
            Some(RoomServerEvent::ParticipantLeft { participant_id }) => {
                assert_eq!(participant_id, "p2");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert_eq!(rooms.member_count("m1"), 1);

        rooms.disconnect("conn-1");
        assert!(!rooms.room_exists("m1"));
    }

    #[tokio::test]
    async fn reconnect_rebinds_participant_slot() {
        let (rooms, bus) = setup();
        let _old = connect(&bus, "conn-old", "u1");
        rooms.join_room("conn-old", "m1", "p1", "Ada", true, true);

        // Same participant id, new connection.
        let mut fresh = connect(&bus, "conn-new", "u1");
        rooms.join_room("conn-new", "m1", "p1", "Ada", false, true);
        assert_eq!(rooms.member_count("m1"), 1);

        match fresh.next() {
            Some(RoomServerEvent::RoomParticipants { participants }) => {
                assert!(participants.is_empty());
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        // The stale connection closing later must not evict the
        // reconnected participant.
        rooms.disconnect("conn-old");
        assert_eq!(rooms.member_count("m1"), 1);
    }

    #[tokio::test]
    async fn joining_second_room_leaves_first() {
        let (rooms, bus) = setup();
        let mut p1 = connect(&bus, "conn-1", "u1");
        let mut other = connect(&bus, "conn-2", "u2");
        rooms.join_room("conn-2", "m1", "p2", "Grace", true, true);
        other.next();
        rooms.join_room("conn-1", "m1", "p1", "Ada", true, true);
        p1.next();
        other.next();

        rooms.join_room("conn-1", "m2", "p1", "Ada", true, true);

        // p1 is gone from m1 and m1's remaining member was told.
        assert_eq!(rooms.member_count("m1"), 1);
        assert_eq!(rooms.member_count("m2"), 1);
        match other.next() {
            Some(RoomServerEvent::ParticipantLeft { participant_id }) => {
                assert_eq!(participant_id, "p1");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
