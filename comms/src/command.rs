use serde::{Deserialize, Serialize};

use crate::signal::{IceCandidateMessage, SessionDescriptionMessage};

/// User Command for joining a room.
/// A room which does not exist yet is created on the first join.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoinCommand {
    // The room to join.
    pub room_id: String,
    // The name to show to the other members, not required to be unique.
    pub display_name: String,
}

/// User Command for publishing a new version of the room's shared code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeChangeCommand {
    // The room whose code is replaced.
    pub room_id: String,
    // The full new code text.
    pub code: String,
}

/// User Command for leaving the room and closing the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaveCommand {}

/// A user command which can be sent to the server by a single connection.
/// All commands are processed in the context of the room coordinator paired with an individual connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserCommand {
    Join(JoinCommand),
    CodeChange(CodeChangeCommand),
    Offer(SessionDescriptionMessage),
    Answer(SessionDescriptionMessage),
    IceCandidate(IceCandidateMessage),
    Leave(LeaveCommand),
}
