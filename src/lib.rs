// Library crate for the buzzer relay server
// This file exposes the public API for integration tests

pub mod room;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use room::directory::{InMemoryRoomDirectory, RoomDirectory};
pub use room::events::{ClientEvent, GameState, ServerEvent};
pub use room::handle::RoomHandle;
pub use room::subscribers::SubscriberRegistry;
pub use shared::{AppError, AppState};
