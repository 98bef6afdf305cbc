use std::collections::HashSet;

use comms::event::Event;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::ConnectionRegistry;

/// [ChannelRegistry] delivers events through a bounded outbox per connection.
///
/// The session owning a connection drains its outbox into the socket. A recipient whose outbox is full
/// misses the event instead of slowing down the sender or growing without bounds.
#[derive(Debug)]
pub struct ChannelRegistry {
    outbox_capacity: usize,
    outboxes: DashMap<String, mpsc::Sender<Event>>,
    groups: DashMap<String, HashSet<String>>,
}

impl ChannelRegistry {
    pub fn new(outbox_capacity: usize) -> Self {
        ChannelRegistry {
            outbox_capacity: outbox_capacity.max(1),
            outboxes: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Register a connection and hand out the receiving side of its outbox
    pub fn connect(&self, connection_id: &str) -> mpsc::Receiver<Event> {
        let (outbox_tx, outbox_rx) = mpsc::channel(self.outbox_capacity);

        self.outboxes.insert(String::from(connection_id), outbox_tx);

        outbox_rx
    }

    /// Forget a connection, its outbox is closed and it leaves every group
    pub fn disconnect(&self, connection_id: &str) {
        self.outboxes.remove(connection_id);
        self.groups.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |members| members.len())
    }

    fn deliver(connection_id: &str, outbox: &mpsc::Sender<Event>, event: Event) {
        match outbox.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection = %connection_id, "outbox is full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(connection = %connection_id, "outbox is closed, dropping event");
            }
        }
    }
}

impl ConnectionRegistry for ChannelRegistry {
    fn send_to(&self, connection_id: &str, event: Event) {
        // clone the sender out so no map guard is held while delivering
        let outbox = self.outboxes.get(connection_id).map(|tx| tx.clone());

        if let Some(outbox) = outbox {
            Self::deliver(connection_id, &outbox, event);
        }
    }

    fn broadcast_to_group(&self, group: &str, event: Event, excluding: Option<&str>) {
        let recipients: Vec<(String, mpsc::Sender<Event>)> = match self.groups.get(group) {
            Some(members) => members
                .iter()
                .filter(|member| Some(member.as_str()) != excluding)
                .filter_map(|member| {
                    self.outboxes
                        .get(member)
                        .map(|tx| (member.clone(), tx.clone()))
                })
                .collect(),
            None => return,
        };

        for (connection_id, outbox) in recipients.iter() {
            Self::deliver(connection_id, outbox, event.clone());
        }
    }

    fn subscribe(&self, connection_id: &str, group: &str) {
        self.groups
            .entry(String::from(group))
            .or_default()
            .insert(String::from(connection_id));
    }

    fn unsubscribe(&self, connection_id: &str, group: &str) {
        self.groups.remove_if_mut(group, |_, members| {
            members.remove(connection_id);
            members.is_empty()
        });
    }
}
