use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// [SignalPayload] is an opaque JSON value exchanged between two peers while they negotiate
/// a direct media channel, such as a session description or a network path candidate.
///
/// The raw text is kept exactly as it was received, hence a relayed payload is
/// re-emitted byte-for-byte without being interpreted by the server.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalPayload(Box<RawValue>);

impl SignalPayload {
    /// Wrap a JSON text as a payload, fails if the text is not valid JSON
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(SignalPayload(RawValue::from_string(String::from(json))?))
    }

    /// The raw JSON text of the payload
    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl Default for SignalPayload {
    fn default() -> Self {
        SignalPayload(RawValue::NULL.to_owned())
    }
}

impl PartialEq for SignalPayload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl fmt::Debug for SignalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalPayload").field(&self.get()).finish()
    }
}

/// An offer or an answer, carrying an opaque session description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionDescriptionMessage {
    /// The room whose other members should receive the description
    pub room_id: String,
    pub description: SignalPayload,
}

/// A network path candidate for the peer connection being negotiated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IceCandidateMessage {
    /// The room whose other members should receive the candidate
    pub room_id: String,
    pub candidate: SignalPayload,
}
