use comms::event::Event;

pub use self::channel_registry::ChannelRegistry;

mod channel_registry;

/// [ConnectionRegistry] is the capability the room coordinator and the signaling relay use to reach connections.
///
/// Every method is fire-and-forget: delivery may be asynchronous and is never awaited,
/// a connection which can not be reached is silently skipped.
pub trait ConnectionRegistry: Send + Sync + 'static {
    /// Deliver an event to a single connection
    fn send_to(&self, connection_id: &str, event: Event);

    /// Deliver an event to every connection subscribed to the group, except the excluded one
    fn broadcast_to_group(&self, group: &str, event: Event, excluding: Option<&str>);

    /// Add a connection to a broadcast group, creating the group when needed
    fn subscribe(&self, connection_id: &str, group: &str);

    /// Remove a connection from a broadcast group, removing a group left empty
    fn unsubscribe(&self, connection_id: &str, group: &str);
}
