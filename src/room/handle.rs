use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use super::events::{ClientEvent, GameState, ServerEvent};
use super::models::Room;
use super::subscribers::SubscriberRegistry;
use crate::shared::AppError;

/// One live room: state plus its subscribers behind a single lock
///
/// Every mutation and every derived broadcast happens inside the critical
/// section, so events on one room are totally ordered while rooms never
/// contend with each other. Nothing blocks under the lock: delivery goes
/// through unbounded senders and a stalled subscriber only stalls itself.
pub struct RoomHandle {
    id: String,
    inner: Mutex<RoomInner>,
}

struct RoomInner {
    room: Room,
    subscribers: SubscriberRegistry,
}

impl RoomHandle {
    pub fn new(id: String, owner_identity: String) -> Self {
        let room = Room::new(id.clone(), owner_identity);
        Self {
            id,
            inner: Mutex::new(RoomInner {
                room,
                subscribers: SubscriberRegistry::new(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state projection, as a new subscriber would receive it
    pub fn snapshot(&self) -> GameState {
        self.inner.lock().unwrap().room.snapshot()
    }

    /// Validates and applies one event from one caller
    ///
    /// JOIN_GAME doubles as a rename for callers already on the roster.
    /// Duplicate BUZZ/READY, NOT_READY while not ready and POP on an empty
    /// queue are deliberate no-ops (no broadcast, no error) so client
    /// retries and duplicate sends stay harmless.
    #[instrument(skip(self), fields(room_id = %self.id))]
    pub fn process_event(&self, caller: &str, event: ClientEvent) -> Result<(), AppError> {
        let mut guard = self.inner.lock().unwrap();
        let RoomInner { room, subscribers } = &mut *guard;

        match event {
            ClientEvent::JoinGame { name } => {
                if room.find_player(caller).is_some() {
                    return rename(room, subscribers, caller, &name);
                }
                let player = room.add_player(caller, &name)?;
                info!(name = %player.display_name, "Player joined room");
                subscribers.broadcast(ServerEvent::JoinGame {
                    name: player.display_name,
                });
            }

            ClientEvent::AskGameState => {
                require_member(room, caller)?;
                subscribers.send_to(
                    caller,
                    ServerEvent::GameState {
                        state: room.snapshot(),
                    },
                );
            }

            ClientEvent::NameChanged { name } => {
                return rename(room, subscribers, caller, &name);
            }

            ClientEvent::Buzz => {
                let name = require_member(room, caller)?;
                if room.is_buzzed(caller) {
                    debug!(name = %name, "Duplicate buzz ignored");
                    return Ok(());
                }
                room.push_buzz(caller);
                subscribers.broadcast(ServerEvent::Buzz { triggerer: name });
            }

            ClientEvent::Ready => {
                let name = require_member(room, caller)?;
                if room.is_ready(caller) {
                    debug!(name = %name, "Duplicate ready ignored");
                    return Ok(());
                }
                room.add_ready(caller);
                subscribers.broadcast(ServerEvent::Ready { player: name });
            }

            ClientEvent::NotReady => {
                let name = require_member(room, caller)?;
                if !room.is_ready(caller) {
                    debug!(name = %name, "Not-ready while not ready ignored");
                    return Ok(());
                }
                room.remove_ready(caller);
                subscribers.broadcast(ServerEvent::NotReady { player: name });
            }

            ClientEvent::ReleaseBuzzer => {
                require_member(room, caller)?;
                room.release();
                subscribers.broadcast(ServerEvent::ReleaseBuzzer);
            }

            ClientEvent::PopFirstBuzzer => {
                require_member(room, caller)?;
                if !room.pop_first_buzz() {
                    debug!("Pop on empty buzz queue ignored");
                    return Ok(());
                }
                subscribers.broadcast(ServerEvent::PopFirstBuzzer);
            }
        }

        Ok(())
    }

    /// Opens a delivery channel for an identity
    ///
    /// Replaces any previous channel for the same identity, then pushes the
    /// current snapshot on the new channel only, followed by IS_ADMIN when
    /// the identity is the room owner. Registration and the snapshot are
    /// one atomic step, so the snapshot can never miss or double-count an
    /// event broadcast around the same time.
    #[instrument(skip(self, sender), fields(room_id = %self.id))]
    pub fn subscribe(&self, identity: &str, sender: mpsc::UnboundedSender<ServerEvent>) {
        let mut guard = self.inner.lock().unwrap();
        let RoomInner { room, subscribers } = &mut *guard;

        subscribers.register(identity, sender);
        subscribers.send_to(
            identity,
            ServerEvent::GameState {
                state: room.snapshot(),
            },
        );
        if identity == room.owner_identity() {
            subscribers.send_to(identity, ServerEvent::IsAdmin);
        }
        debug!(subscriber_count = subscribers.len(), "Subscriber registered");
    }

    /// Tears down a departed subscriber
    ///
    /// Unregisters the channel and, when the identity was a roster member,
    /// removes it from roster, buzz queue and ready set and broadcasts
    /// LEAVE_GAME - all under the room lock, so no event from the departing
    /// identity can interleave with the cleanup.
    #[instrument(skip(self), fields(room_id = %self.id))]
    pub fn disconnect(&self, identity: &str) {
        let mut guard = self.inner.lock().unwrap();
        let RoomInner { room, subscribers } = &mut *guard;

        subscribers.unregister(identity);

        let Some(player) = room.find_player(identity) else {
            debug!("Disconnected subscriber was not on the roster");
            return;
        };
        let name = player.display_name.clone();

        room.remove_player(identity);
        room.remove_from_sets(identity);
        info!(name = %name, "Player left room");
        subscribers.broadcast(ServerEvent::LeaveGame { name });
    }
}

/// Resolves the caller to its display name, failing if it never joined
fn require_member(room: &Room, caller: &str) -> Result<String, AppError> {
    room.find_player(caller)
        .map(|p| p.display_name.clone())
        .ok_or_else(|| AppError::PlayerNotFound(caller.to_string()))
}

fn rename(
    room: &mut Room,
    subscribers: &SubscriberRegistry,
    caller: &str,
    new_name: &str,
) -> Result<(), AppError> {
    let player = room
        .find_player_mut(caller)
        .ok_or_else(|| AppError::PlayerNotFound(caller.to_string()))?;
    let previous_name = std::mem::replace(&mut player.display_name, new_name.to_string());

    info!(previous_name = %previous_name, name = %new_name, "Player renamed");
    subscribers.broadcast(ServerEvent::NameChanged {
        previous_name,
        name: new_name.to_string(),
    });
    Ok(())
}
