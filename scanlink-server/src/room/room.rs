use scanlink_core::{ConnectionId, MediaInfo, MediaState, Role, RoomStats};
use std::time::Instant;

/// One connected user session inside a room. A record is only ever mutated
/// in response to its own connection's events.
#[derive(Debug, Clone)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub role: Role,
    pub joined_at: Instant,
    pub media_state: MediaState,
    pub media_info: Option<MediaInfo>,
    pub last_heartbeat: Instant,
}

impl Participant {
    pub fn new(connection_id: ConnectionId, display_name: String, role: Role, now: Instant) -> Self {
        Self {
            connection_id,
            display_name,
            role,
            joined_at: now,
            media_state: MediaState::None,
            media_info: None,
            last_heartbeat: now,
        }
    }
}

/// A call session: ordered participant list keyed by connection id.
#[derive(Debug)]
pub struct Room {
    id: String,
    participants: Vec<Participant>,
    created_at: Instant,
    host_id: Option<ConnectionId>,
    empty_since: Option<Instant>,
}

impl Room {
    pub fn new(id: String, now: Instant) -> Self {
        Self {
            id,
            participants: Vec::new(),
            created_at: now,
            host_id: None,
            empty_since: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn host_id(&self) -> Option<&ConnectionId> {
        self.host_id.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// How long this room has sat empty, if it is.
    pub fn empty_since(&self) -> Option<Instant> {
        self.empty_since
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.participants
            .iter()
            .any(|p| &p.connection_id == connection_id)
    }

    pub fn get_mut(&mut self, connection_id: &ConnectionId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| &p.connection_id == connection_id)
    }

    /// Appends a participant. Returns false (and changes nothing) when the
    /// connection id is already present.
    pub fn join(&mut self, participant: Participant) -> bool {
        if self.contains(&participant.connection_id) {
            return false;
        }
        if participant.role == Role::Host && self.host_id.is_none() {
            self.host_id = Some(participant.connection_id.clone());
        }
        self.participants.push(participant);
        self.empty_since = None;
        true
    }

    pub fn remove(&mut self, connection_id: &ConnectionId, now: Instant) -> Option<Participant> {
        let idx = self
            .participants
            .iter()
            .position(|p| &p.connection_id == connection_id)?;
        let removed = self.participants.remove(idx);

        if self.host_id.as_ref() == Some(connection_id) {
            self.host_id = self
                .participants
                .iter()
                .find(|p| p.role == Role::Host)
                .map(|p| p.connection_id.clone());
        }
        if self.participants.is_empty() {
            self.empty_since = Some(now);
        }
        Some(removed)
    }

    pub fn names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.display_name.clone())
            .collect()
    }

    pub fn stats(&self) -> RoomStats {
        let hosts = self
            .participants
            .iter()
            .filter(|p| p.role == Role::Host)
            .count();
        let guests = self
            .participants
            .iter()
            .filter(|p| p.role == Role::Guest)
            .count();
        RoomStats {
            hosts,
            guests,
            total: self.participants.len(),
        }
    }

    /// Every member except the given one — the recipient set for relayed
    /// payloads.
    pub fn others(&self, connection_id: &ConnectionId) -> Vec<ConnectionId> {
        self.participants
            .iter()
            .filter(|p| &p.connection_id != connection_id)
            .map(|p| p.connection_id.clone())
            .collect()
    }

    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.participants
            .iter()
            .map(|p| p.connection_id.clone())
            .collect()
    }
}
