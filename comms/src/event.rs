use serde::{Deserialize, Serialize};

use crate::signal::{IceCandidateMessage, SessionDescriptionMessage};

/// A single member of a room as it is shown to the other members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    pub connection_id: String,
    pub display_name: String,
}

/// Reply sent once a connection is accepted, tells the client its own connection id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedReplyEvent {
    pub connection_id: String,
}

/// The shared code of a room, either the initial snapshot for a joining member
/// or an update published by another member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChangeEvent {
    pub code: String,
}

/// A connection has joined a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedBroadcastEvent {
    /// Everyone in the room after the join, the joiner included
    pub members: Vec<MemberDetail>,
    /// The display name of the connection that has joined
    pub display_name: String,
    /// The id of the connection that has joined
    pub connection_id: String,
}

/// A connection has left a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedBroadcastEvent {
    /// The id of the connection that has left
    pub connection_id: String,
    /// The last known display name of the connection that has left
    pub display_name: Option<String>,
    /// Everyone still in the room
    pub members: Vec<MemberDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Events that can be sent to the client
/// Events maybe related to different connections of a room, the receipient is a single connection
pub enum Event {
    Connected(ConnectedReplyEvent),
    CodeChange(CodeChangeEvent),
    Joined(JoinedBroadcastEvent),
    Disconnected(DisconnectedBroadcastEvent),
    Offer(SessionDescriptionMessage),
    Answer(SessionDescriptionMessage),
    IceCandidate(IceCandidateMessage),
}
