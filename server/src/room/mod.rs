pub use self::code_store::{SharedCodeStore, DEFAULT_CODE};
pub use self::coordinator::RoomCoordinator;
pub use self::presence_store::{Departure, PresenceStore};

mod code_store;
mod coordinator;
mod presence_store;
