use std::collections::HashMap;

/// The code every room starts with until a member publishes something else
pub const DEFAULT_CODE: &str = r#"console.log("Hello from JavaScript!");"#;

/// [SharedCodeStore] holds the latest code text of every room.
///
/// Entries outlive the rooms' memberships, a room that empties and is joined again
/// picks up where it was left.
#[derive(Debug, Default)]
pub struct SharedCodeStore {
    room_to_code: HashMap<String, String>,
}

impl SharedCodeStore {
    pub fn new() -> Self {
        SharedCodeStore::default()
    }

    /// The stored code of the room, or [DEFAULT_CODE] if nothing was written yet
    pub fn current(&self, room_id: &str) -> &str {
        self.room_to_code
            .get(room_id)
            .map(String::as_str)
            .unwrap_or(DEFAULT_CODE)
    }

    /// Overwrite the code of the room
    pub fn replace(&mut self, room_id: &str, code: String) {
        self.room_to_code.insert(String::from(room_id), code);
    }

    /// The code explicitly written for the room, if any
    pub fn stored(&self, room_id: &str) -> Option<&str> {
        self.room_to_code.get(room_id).map(String::as_str)
    }
}
