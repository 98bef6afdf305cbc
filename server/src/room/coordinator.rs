use std::sync::Arc;

use comms::event::{
    CodeChangeEvent, DisconnectedBroadcastEvent, Event, JoinedBroadcastEvent, MemberDetail,
};
use tokio::sync::Mutex;

use super::{code_store::SharedCodeStore, presence_store::PresenceStore};
use crate::registry::ConnectionRegistry;

#[derive(Debug, Default)]
struct RoomState {
    presence: PresenceStore,
    codes: SharedCodeStore,
}

/// [RoomCoordinator] handles joining and leaving rooms, and the shared code of every room.
///
/// All the state lives behind a single lock. Every event is enqueued while the lock is held,
/// hence members see the events of a room in the order the state changed. Enqueueing never
/// blocks, the registry hands events to per-connection outboxes.
pub struct RoomCoordinator<R> {
    state: Mutex<RoomState>,
    registry: Arc<R>,
}

impl<R: ConnectionRegistry> RoomCoordinator<R> {
    pub fn new(registry: Arc<R>) -> Self {
        RoomCoordinator {
            state: Mutex::new(RoomState::default()),
            registry,
        }
    }

    /// Add a connection to a room and broadcast that it joined
    ///
    /// The joiner receives the current code of the room first, then every member
    /// of the room, the joiner included, receives the new member list.
    /// A connection that is already in another room leaves that room first.
    pub async fn join(&self, connection_id: &str, room_id: &str, display_name: &str) {
        let mut state = self.state.lock().await;

        if state
            .presence
            .room_of(connection_id)
            .is_some_and(|current| current != room_id)
        {
            self.leave_room(&mut state, connection_id);
        }

        state.presence.insert(room_id, connection_id, display_name);
        self.registry.subscribe(connection_id, room_id);

        self.registry.send_to(
            connection_id,
            Event::CodeChange(CodeChangeEvent {
                code: String::from(state.codes.current(room_id)),
            }),
        );

        let members = state.presence.snapshot(room_id);

        tracing::info!(
            connection = %connection_id,
            room = %room_id,
            members = members.len(),
            "joined room"
        );

        self.registry.broadcast_to_group(
            room_id,
            Event::Joined(JoinedBroadcastEvent {
                members,
                display_name: String::from(display_name),
                connection_id: String::from(connection_id),
            }),
            None,
        );
    }

    /// Replace the code of a room and send it to every other member of the room
    pub async fn update_code(&self, connection_id: &str, room_id: &str, code: String) {
        let mut state = self.state.lock().await;
        state.codes.replace(room_id, code.clone());

        tracing::debug!(
            connection = %connection_id,
            room = %room_id,
            len = code.len(),
            "code changed"
        );

        self.registry.broadcast_to_group(
            room_id,
            Event::CodeChange(CodeChangeEvent { code }),
            Some(connection_id),
        );
    }

    /// Remove a connection from its room and broadcast that it left, returns false if it was not in any room
    ///
    /// Safe to call more than once, only the first call has an effect.
    pub async fn disconnect(&self, connection_id: &str) -> bool {
        let mut state = self.state.lock().await;

        self.leave_room(&mut state, connection_id)
    }

    /// The current members of a room
    pub async fn members(&self, room_id: &str) -> Vec<MemberDetail> {
        self.state.lock().await.presence.snapshot(room_id)
    }

    /// Whether the room currently has any member
    pub async fn contains_room(&self, room_id: &str) -> bool {
        self.state.lock().await.presence.contains_room(room_id)
    }

    /// The code explicitly written for a room, kept even after the room empties
    pub async fn stored_code(&self, room_id: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .codes
            .stored(room_id)
            .map(String::from)
    }

    fn leave_room(&self, state: &mut RoomState, connection_id: &str) -> bool {
        let Some(departure) = state.presence.remove(connection_id) else {
            return false;
        };

        self.registry.unsubscribe(connection_id, &departure.room_id);

        tracing::info!(
            connection = %connection_id,
            room = %departure.room_id,
            members = departure.members.len(),
            "left room"
        );

        self.registry.broadcast_to_group(
            &departure.room_id,
            Event::Disconnected(DisconnectedBroadcastEvent {
                connection_id: String::from(connection_id),
                display_name: Some(departure.display_name),
                members: departure.members,
            }),
            Some(connection_id),
        );

        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{registry::ChannelRegistry, room::DEFAULT_CODE};

    struct Fixture {
        registry: Arc<ChannelRegistry>,
        coordinator: RoomCoordinator<ChannelRegistry>,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(ChannelRegistry::new(64));
            let coordinator = RoomCoordinator::new(registry.clone());

            Fixture {
                registry,
                coordinator,
            }
        }

        fn connect(&self, connection_id: &str) -> mpsc::Receiver<Event> {
            self.registry.connect(connection_id)
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn member(connection_id: &str, display_name: &str) -> MemberDetail {
        MemberDetail {
            connection_id: connection_id.to_string(),
            display_name: display_name.to_string(),
        }
    }

    fn code(code: &str) -> Event {
        Event::CodeChange(CodeChangeEvent {
            code: code.to_string(),
        })
    }

    #[tokio::test]
    async fn test_two_members_edit_and_leave() {
        let fixture = Fixture::new();
        let mut a_rx = fixture.connect("a");
        let mut b_rx = fixture.connect("b");

        fixture.coordinator.join("a", "r1", "Alice").await;
        assert_eq!(
            drain(&mut a_rx),
            vec![
                code(DEFAULT_CODE),
                Event::Joined(JoinedBroadcastEvent {
                    members: vec![member("a", "Alice")],
                    display_name: "Alice".to_string(),
                    connection_id: "a".to_string(),
                }),
            ]
        );

        fixture.coordinator.join("b", "r1", "Bob").await;
        let joined = Event::Joined(JoinedBroadcastEvent {
            members: vec![member("a", "Alice"), member("b", "Bob")],
            display_name: "Bob".to_string(),
            connection_id: "b".to_string(),
        });
        assert_eq!(drain(&mut a_rx), vec![joined.clone()]);
        assert_eq!(drain(&mut b_rx), vec![code(DEFAULT_CODE), joined]);

        fixture
            .coordinator
            .update_code("a", "r1", "print(1)".to_string())
            .await;
        assert!(drain(&mut a_rx).is_empty());
        assert_eq!(drain(&mut b_rx), vec![code("print(1)")]);

        assert!(fixture.coordinator.disconnect("b").await);
        assert_eq!(
            drain(&mut a_rx),
            vec![Event::Disconnected(DisconnectedBroadcastEvent {
                connection_id: "b".to_string(),
                display_name: Some("Bob".to_string()),
                members: vec![member("a", "Alice")],
            })]
        );
        assert_eq!(fixture.coordinator.members("r1").await, vec![member("a", "Alice")]);

        assert!(fixture.coordinator.disconnect("a").await);
        assert!(!fixture.coordinator.contains_room("r1").await);
        assert_eq!(
            fixture.coordinator.stored_code("r1").await,
            Some("print(1)".to_string())
        );
        assert_eq!(fixture.registry.group_size("r1"), 0);
    }

    #[tokio::test]
    async fn test_rejoining_an_emptied_room_restores_its_code() {
        let fixture = Fixture::new();
        let mut a_rx = fixture.connect("a");
        let mut c_rx = fixture.connect("c");

        fixture.coordinator.join("a", "r1", "Alice").await;
        fixture
            .coordinator
            .update_code("a", "r1", "let x = 1;".to_string())
            .await;
        fixture.coordinator.disconnect("a").await;
        drain(&mut a_rx);

        fixture.coordinator.join("c", "r1", "Carol").await;
        assert_eq!(drain(&mut c_rx)[0], code("let x = 1;"));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let fixture = Fixture::new();
        let mut a_rx = fixture.connect("a");
        let _b_rx = fixture.connect("b");

        fixture.coordinator.join("a", "r1", "Alice").await;
        fixture.coordinator.join("b", "r1", "Bob").await;
        drain(&mut a_rx);

        assert!(fixture.coordinator.disconnect("b").await);
        assert!(!fixture.coordinator.disconnect("b").await);
        assert_eq!(drain(&mut a_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_disconnecting_a_stranger_is_a_no_op() {
        let fixture = Fixture::new();
        let mut a_rx = fixture.connect("a");

        fixture.coordinator.join("a", "r1", "Alice").await;
        drain(&mut a_rx);

        assert!(!fixture.coordinator.disconnect("ghost").await);
        assert!(drain(&mut a_rx).is_empty());
    }

    #[tokio::test]
    async fn test_joining_another_room_leaves_the_previous_one() {
        let fixture = Fixture::new();
        let mut a_rx = fixture.connect("a");
        let mut b_rx = fixture.connect("b");

        fixture.coordinator.join("a", "r1", "Alice").await;
        fixture.coordinator.join("b", "r1", "Bob").await;
        drain(&mut a_rx);
        drain(&mut b_rx);

        fixture.coordinator.join("b", "r2", "Bob").await;

        assert_eq!(
            drain(&mut a_rx),
            vec![Event::Disconnected(DisconnectedBroadcastEvent {
                connection_id: "b".to_string(),
                display_name: Some("Bob".to_string()),
                members: vec![member("a", "Alice")],
            })]
        );
        assert_eq!(fixture.coordinator.members("r2").await, vec![member("b", "Bob")]);

        // b no longer receives the code of r1
        fixture
            .coordinator
            .update_code("a", "r1", "print(1)".to_string())
            .await;
        assert!(!drain(&mut b_rx).contains(&code("print(1)")));
    }

    /// Delivers through a [ChannelRegistry] but holds up the fan-out of the code "first"
    struct StallingRegistry {
        inner: ChannelRegistry,
    }

    impl ConnectionRegistry for StallingRegistry {
        fn send_to(&self, connection_id: &str, event: Event) {
            self.inner.send_to(connection_id, event);
        }

        fn broadcast_to_group(&self, group: &str, event: Event, excluding: Option<&str>) {
            if matches!(&event, Event::CodeChange(event) if event.code == "first") {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.inner.broadcast_to_group(group, event, excluding);
        }

        fn subscribe(&self, connection_id: &str, group: &str) {
            self.inner.subscribe(connection_id, group);
        }

        fn unsubscribe(&self, connection_id: &str, group: &str) {
            self.inner.unsubscribe(connection_id, group);
        }
    }

    fn last_code(events: &[Event]) -> Option<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::CodeChange(event) => Some(event.code.clone()),
                _ => None,
            })
            .last()
    }

    fn last_members(events: &[Event]) -> Option<Vec<MemberDetail>> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Joined(event) => Some(event.members.clone()),
                Event::Disconnected(event) => Some(event.members.clone()),
                _ => None,
            })
            .last()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writers_reach_members_in_write_order() {
        let registry = Arc::new(StallingRegistry {
            inner: ChannelRegistry::new(64),
        });
        let coordinator = Arc::new(RoomCoordinator::new(registry.clone()));
        let _a_rx = registry.inner.connect("a");
        let _b_rx = registry.inner.connect("b");
        let mut c_rx = registry.inner.connect("c");

        coordinator.join("a", "r1", "Alice").await;
        coordinator.join("b", "r1", "Bob").await;
        coordinator.join("c", "r1", "Carol").await;

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move {
                coordinator
                    .update_code("a", "r1", "first".to_string())
                    .await;
            }
        });
        // let the first writer get going before the second one starts
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = tokio::spawn({
            let coordinator = coordinator.clone();
            async move {
                coordinator
                    .update_code("b", "r1", "second".to_string())
                    .await;
            }
        });
        first.await.unwrap();
        second.await.unwrap();

        let received = drain(&mut c_rx);
        assert_eq!(last_code(&received), coordinator.stored_code("r1").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_and_leaves_end_with_current_snapshot() {
        let fixture = Arc::new(Fixture::new());
        let mut receivers: Vec<_> = (0..16)
            .map(|i| fixture.connect(&format!("c{}", i)))
            .collect();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let fixture = fixture.clone();
                tokio::spawn(async move {
                    fixture
                        .coordinator
                        .join(&format!("c{}", i), "busy", &format!("user-{}", i))
                        .await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(fixture.coordinator.members("busy").await.len(), 16);

        let handles: Vec<_> = (0..16)
            .filter(|i| i % 2 == 1)
            .map(|i| {
                let fixture = fixture.clone();
                tokio::spawn(async move {
                    fixture.coordinator.disconnect(&format!("c{}", i)).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let current = fixture.coordinator.members("busy").await;
        assert_eq!(current.len(), 8);

        // whatever interleaving happened, the last snapshot every remaining member saw is the current one
        for rx in receivers.iter_mut().step_by(2) {
            let received = drain(rx);
            assert_eq!(last_members(&received), Some(current.clone()));
        }

        let handles: Vec<_> = (0..16)
            .filter(|i| i % 2 == 0)
            .map(|i| {
                let fixture = fixture.clone();
                tokio::spawn(async move {
                    fixture.coordinator.disconnect(&format!("c{}", i)).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(!fixture.coordinator.contains_room("busy").await);
    }
}
