use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

use super::handle::RoomHandle;
use crate::shared::AppError;

/// Process-wide registry of live rooms
///
/// Rooms are permanent for the process lifetime; there is no delete or
/// eviction operation. The directory only resolves ids to handles - all
/// per-room work happens on the handle, outside the directory's own lock.
#[async_trait]
pub trait RoomDirectory {
    /// Registers a new room, failing if the id is already taken
    async fn create_room(
        &self,
        room_id: &str,
        owner_identity: &str,
    ) -> Result<Arc<RoomHandle>, AppError>;

    /// Looks up an existing room, failing if it does not exist
    async fn get_room(&self, room_id: &str) -> Result<Arc<RoomHandle>, AppError>;
}

/// In-memory implementation of RoomDirectory
pub struct InMemoryRoomDirectory {
    rooms: Mutex<HashMap<String, Arc<RoomHandle>>>,
}

impl Default for InMemoryRoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    #[instrument(skip(self))]
    async fn create_room(
        &self,
        room_id: &str,
        owner_identity: &str,
    ) -> Result<Arc<RoomHandle>, AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.contains_key(room_id) {
            warn!(room_id = %room_id, "Room already exists");
            return Err(AppError::RoomAlreadyExists(room_id.to_string()));
        }

        let handle = Arc::new(RoomHandle::new(
            room_id.to_string(),
            owner_identity.to_string(),
        ));
        rooms.insert(room_id.to_string(), Arc::clone(&handle));

        info!(room_id = %room_id, room_count = rooms.len(), "Room created");
        Ok(handle)
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Arc<RoomHandle>, AppError> {
        let rooms = self.rooms.lock().unwrap();
        match rooms.get(room_id) {
            Some(handle) => Ok(Arc::clone(handle)),
            None => {
                debug!(room_id = %room_id, "Room not found");
                Err(AppError::RoomNotFound(room_id.to_string()))
            }
        }
    }
}
