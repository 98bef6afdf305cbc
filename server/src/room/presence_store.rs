use std::collections::HashMap;

use comms::event::MemberDetail;

/// [Departure] describes a connection that has been removed from a room
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub room_id: String,
    pub display_name: String,
    /// Whoever is still in the room after the removal
    pub members: Vec<MemberDetail>,
}

/// [PresenceStore] is a smart container for keeping track of who is in which room.
///
/// A connection is a member of at most one room, and a room only exists while it has at least one member.
/// Members are kept in joining order, that is the order of every snapshot.
#[derive(Debug, Default)]
pub struct PresenceStore {
    room_to_members: HashMap<String, Vec<String>>,
    connection_to_room: HashMap<String, String>,
    connection_to_name: HashMap<String, String>,
}

impl PresenceStore {
    pub fn new() -> Self {
        PresenceStore::default()
    }

    /// Add a connection to a room, creating the room if needed.
    ///
    /// A connection that is already in the room keeps its place and only has its display name replaced.
    /// The connection must not be a member of another room, [PresenceStore::remove] it first.
    pub fn insert(&mut self, room_id: &str, connection_id: &str, display_name: &str) {
        debug_assert!(
            self.room_of(connection_id)
                .map_or(true, |current| current == room_id),
            "connection is already in another room"
        );

        self.connection_to_name
            .insert(String::from(connection_id), String::from(display_name));
        self.connection_to_room
            .insert(String::from(connection_id), String::from(room_id));

        let members = self.room_to_members.entry(String::from(room_id)).or_default();

        if !members.iter().any(|member| member == connection_id) {
            members.push(String::from(connection_id));
        }
    }

    /// Removes a connection from its room, deleting the room once it is empty.
    /// Does nothing and returns [None] if the connection is not in any room
    pub fn remove(&mut self, connection_id: &str) -> Option<Departure> {
        let room_id = self.connection_to_room.remove(connection_id)?;
        let display_name = self
            .connection_to_name
            .remove(connection_id)
            .unwrap_or_default();

        if let Some(members) = self.room_to_members.get_mut(&room_id) {
            members.retain(|member| member != connection_id);

            if members.is_empty() {
                self.room_to_members.remove(&room_id);
            }
        }

        let members = self.snapshot(&room_id);

        Some(Departure {
            room_id,
            display_name,
            members,
        })
    }

    /// The room the connection is currently a member of
    pub fn room_of(&self, connection_id: &str) -> Option<&str> {
        self.connection_to_room.get(connection_id).map(String::as_str)
    }

    pub fn display_name(&self, connection_id: &str) -> Option<&str> {
        self.connection_to_name.get(connection_id).map(String::as_str)
    }

    /// The current members of a room, empty for a room that does not exist
    pub fn snapshot(&self, room_id: &str) -> Vec<MemberDetail> {
        self.room_to_members
            .get(room_id)
            .map(|members| {
                members
                    .iter()
                    .map(|connection_id| MemberDetail {
                        connection_id: connection_id.clone(),
                        display_name: self
                            .display_name(connection_id)
                            .map(String::from)
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room_id: &str) -> bool {
        self.room_to_members.contains_key(room_id)
    }
}
