use crate::room::room::{Participant, Room};
use scanlink_core::{ConnectionId, MediaInfo, MediaState, Role, RoomStats};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything the relay needs to broadcast a roster change: the affected
/// user, the resulting roster, and who should hear about it.
#[derive(Debug, Clone)]
pub struct RosterBroadcast {
    pub room: String,
    pub user_id: ConnectionId,
    pub user_name: String,
    pub role: Role,
    pub participants: Vec<String>,
    pub participant_count: usize,
    pub room_stats: RoomStats,
    pub recipients: Vec<ConnectionId>,
    pub room_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct MediaReadyBroadcast {
    pub user_id: ConnectionId,
    pub user_name: String,
    pub role: Role,
    pub media_info: MediaInfo,
    pub recipients: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub stale_leaves: Vec<RosterBroadcast>,
    pub purged_rooms: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub participants: Vec<String>,
    pub participant_count: usize,
    pub room_stats: RoomStats,
    pub host: Option<String>,
    pub age_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub rooms: Vec<RoomSummary>,
    pub connections: usize,
}

/// Authoritative, in-memory store of rooms and participants. Owned by the
/// relay task; every mutation goes through it one command at a time, which
/// is the whole concurrency story.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    memberships: HashMap<ConnectionId, String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.memberships.len()
    }

    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.memberships.get(connection_id).map(String::as_str)
    }

    pub fn is_member(&self, connection_id: &ConnectionId, room_id: &str) -> bool {
        self.room_of(connection_id) == Some(room_id)
    }

    /// Recipient set for a payload relayed by `connection_id` into
    /// `room_id`: every other member, or nothing when the sender does not
    /// belong to that room.
    pub fn relay_targets(&self, connection_id: &ConnectionId, room_id: &str) -> Vec<ConnectionId> {
        if !self.is_member(connection_id, room_id) {
            return Vec::new();
        }
        self.rooms
            .get(room_id)
            .map(|room| room.others(connection_id))
            .unwrap_or_default()
    }

    pub fn display_name(&self, connection_id: &ConnectionId) -> Option<String> {
        let room = self.rooms.get(self.room_of(connection_id)?)?;
        room.participants()
            .iter()
            .find(|p| &p.connection_id == connection_id)
            .map(|p| p.display_name.clone())
    }

    /// Adds the connection to the room, creating the room when the id is
    /// unseen. Returns the roster broadcast for the join, plus a `user-left`
    /// broadcast first if the connection was still registered in another
    /// room. A re-join of the room it is already in is a no-op.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        room_id: &str,
        display_name: String,
        role: Role,
        now: Instant,
    ) -> (Option<RosterBroadcast>, Option<RosterBroadcast>) {
        if self.is_member(&connection_id, room_id) {
            debug!(%connection_id, room = room_id, "re-join ignored");
            return (None, None);
        }

        let prior_leave = self.leave(&connection_id, now);

        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                info!(room = room_id, "creating room");
                Room::new(room_id.to_string(), now)
            });

        let participant = Participant::new(connection_id.clone(), display_name.clone(), role, now);
        room.join(participant);
        self.memberships
            .insert(connection_id.clone(), room_id.to_string());

        let broadcast = RosterBroadcast {
            room: room_id.to_string(),
            user_id: connection_id,
            user_name: display_name,
            role,
            participants: room.names(),
            participant_count: room.len(),
            room_stats: room.stats(),
            // membership-changed goes to every member, the joiner included
            recipients: room.member_ids(),
            room_deleted: false,
        };

        (prior_leave, Some(broadcast))
    }

    /// Removes the connection from whatever room it is in. The room is
    /// deleted the instant its list empties.
    pub fn leave(&mut self, connection_id: &ConnectionId, now: Instant) -> Option<RosterBroadcast> {
        let room_id = self.memberships.remove(connection_id)?;
        let room = self.rooms.get_mut(&room_id)?;
        let removed = room.remove(connection_id, now)?;

        let broadcast = RosterBroadcast {
            room: room_id.clone(),
            user_id: removed.connection_id,
            user_name: removed.display_name,
            role: removed.role,
            participants: room.names(),
            participant_count: room.len(),
            room_stats: room.stats(),
            recipients: room.member_ids(),
            room_deleted: room.is_empty(),
        };

        if room.is_empty() {
            info!(room = %room_id, "room empty, removing");
            self.rooms.remove(&room_id);
        }

        Some(broadcast)
    }

    /// Refreshes the participant's liveness stamp. Returns false when the
    /// connection is not in any room.
    pub fn heartbeat(&mut self, connection_id: &ConnectionId, now: Instant) -> bool {
        let Some(room_id) = self.memberships.get(connection_id) else {
            return false;
        };
        let Some(participant) = self
            .rooms
            .get_mut(room_id)
            .and_then(|room| room.get_mut(connection_id))
        else {
            return false;
        };
        participant.last_heartbeat = now;
        true
    }

    pub fn set_media_ready(
        &mut self,
        connection_id: &ConnectionId,
        media_info: MediaInfo,
    ) -> Option<MediaReadyBroadcast> {
        let room_id = self.memberships.get(connection_id)?.clone();
        let room = self.rooms.get_mut(&room_id)?;
        let recipients = room.others(connection_id);
        let participant = room.get_mut(connection_id)?;

        participant.media_state = MediaState::Ready;
        participant.media_info = Some(media_info);

        Some(MediaReadyBroadcast {
            user_id: participant.connection_id.clone(),
            user_name: participant.display_name.clone(),
            role: participant.role,
            media_info,
            recipients,
        })
    }

    /// Periodic cleanup: participants whose heartbeat went quiet are treated
    /// as abandoned connections, and rooms that somehow sat empty past the
    /// backstop threshold are purged.
    pub fn sweep(
        &mut self,
        now: Instant,
        stale_participant_after: Duration,
        empty_room_after: Duration,
    ) -> SweepOutcome {
        let stale: Vec<ConnectionId> = self
            .rooms
            .values()
            .flat_map(|room| room.participants())
            .filter(|p| now.duration_since(p.last_heartbeat) > stale_participant_after)
            .map(|p| p.connection_id.clone())
            .collect();

        let mut outcome = SweepOutcome::default();
        for connection_id in stale {
            info!(%connection_id, "purging stale participant");
            if let Some(broadcast) = self.leave(&connection_id, now) {
                outcome.stale_leaves.push(broadcast);
            }
        }

        let before = self.rooms.len();
        self.rooms.retain(|_, room| {
            !room
                .empty_since()
                .is_some_and(|since| now.duration_since(since) > empty_room_after)
        });
        outcome.purged_rooms = before - self.rooms.len();
        if outcome.purged_rooms > 0 {
            info!(count = outcome.purged_rooms, "purged long-empty rooms");
        }

        outcome
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let now = Instant::now();
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .values()
            .map(|room| RoomSummary {
                id: room.id().to_string(),
                participants: room.names(),
                participant_count: room.len(),
                room_stats: room.stats(),
                host: room.host_id().and_then(|id| {
                    room.participants()
                        .iter()
                        .find(|p| &p.connection_id == id)
                        .map(|p| p.display_name.clone())
                }),
                age_secs: now.duration_since(room.created_at()).as_secs(),
            })
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));

        RegistrySnapshot {
            rooms,
            connections: self.memberships.len(),
        }
    }

    /// Test-only hook: plant a room with no members, as if immediate
    /// empty-delete had been missed, so the sweep backstop can be exercised.
    #[cfg(test)]
    pub(crate) fn insert_empty_room(&mut self, room_id: &str, emptied_at: Instant) {
        let mut room = Room::new(room_id.to_string(), emptied_at);
        let probe = Participant::new(
            ConnectionId::new(),
            "probe".to_string(),
            Role::Unknown,
            emptied_at,
        );
        let probe_id = probe.connection_id.clone();
        room.join(probe);
        room.remove(&probe_id, emptied_at);
        self.rooms.insert(room_id.to_string(), room);
    }
}
