use std::sync::Arc;

use comms::{
    event::Event,
    signal::{IceCandidateMessage, SessionDescriptionMessage},
};

use crate::registry::ConnectionRegistry;

/// [SignalingRelay] forwards peer connection negotiation messages to the other members of a room.
///
/// Nothing is stored and nothing is validated, the payloads are opaque to the server.
/// The sender is trusted to be a member of the room it names.
pub struct SignalingRelay<R> {
    registry: Arc<R>,
}

impl<R: ConnectionRegistry> SignalingRelay<R> {
    pub fn new(registry: Arc<R>) -> Self {
        SignalingRelay { registry }
    }

    pub fn relay_offer(&self, sender: &str, message: SessionDescriptionMessage) {
        tracing::debug!(connection = %sender, room = %message.room_id, "relaying offer");

        let room_id = message.room_id.clone();
        self.forward(sender, &room_id, Event::Offer(message));
    }

    pub fn relay_answer(&self, sender: &str, message: SessionDescriptionMessage) {
        tracing::debug!(connection = %sender, room = %message.room_id, "relaying answer");

        let room_id = message.room_id.clone();
        self.forward(sender, &room_id, Event::Answer(message));
    }

    pub fn relay_candidate(&self, sender: &str, message: IceCandidateMessage) {
        tracing::debug!(connection = %sender, room = %message.room_id, "relaying ice candidate");

        let room_id = message.room_id.clone();
        self.forward(sender, &room_id, Event::IceCandidate(message));
    }

    fn forward(&self, sender: &str, room_id: &str, event: Event) {
        self.registry
            .broadcast_to_group(room_id, event, Some(sender));
    }
}
