// Public API - what other modules can use
pub use handlers::{create_room, stream_events, submit_event};

// Internal modules
pub mod directory;
pub mod events;
pub mod handle;
pub mod handlers;
pub mod models;
pub mod subscribers;
