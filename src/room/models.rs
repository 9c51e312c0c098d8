use crate::room::events::GameState;
use crate::shared::AppError;

/// A player inside one room. The identity is the caller-supplied opaque id
/// and never leaves the server; only display names go out on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub identity: String,
    pub display_name: String,
}

/// Authoritative state of one room: who joined (in join order), who has
/// buzzed (in buzz order, head = earliest) and who is ready.
///
/// This is a pure container. It never cascades removals or emits events;
/// the room handle drives every mutation and does the cascading explicitly.
#[derive(Debug)]
pub struct Room {
    id: String,
    owner_identity: String,
    roster: Vec<Player>,
    buzz_queue: Vec<String>,
    ready_set: Vec<String>,
}

impl Room {
    pub fn new(id: String, owner_identity: String) -> Self {
        Self {
            id,
            owner_identity,
            roster: Vec::new(),
            buzz_queue: Vec::new(),
            ready_set: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identity of the room creator. Immutable after creation.
    pub fn owner_identity(&self) -> &str {
        &self.owner_identity
    }

    /// Appends a new player to the roster
    ///
    /// Fails if the identity is already on the roster; the caller is
    /// expected to route that case as a rename instead.
    pub fn add_player(&mut self, identity: &str, display_name: &str) -> Result<Player, AppError> {
        if self.find_player(identity).is_some() {
            return Err(AppError::Validation(format!(
                "player {} already in room {}",
                identity, self.id
            )));
        }
        let player = Player {
            identity: identity.to_string(),
            display_name: display_name.to_string(),
        };
        self.roster.push(player.clone());
        Ok(player)
    }

    /// Removes a player from the roster (no-op if absent)
    pub fn remove_player(&mut self, identity: &str) {
        self.roster.retain(|p| p.identity != identity);
    }

    pub fn find_player(&self, identity: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.identity == identity)
    }

    pub fn find_player_mut(&mut self, identity: &str) -> Option<&mut Player> {
        self.roster.iter_mut().find(|p| p.identity == identity)
    }

    pub fn is_buzzed(&self, identity: &str) -> bool {
        self.buzz_queue.iter().any(|id| id == identity)
    }

    /// Appends to the buzz queue. Callers must check roster membership and
    /// duplicates first; relative order of existing entries never changes.
    pub fn push_buzz(&mut self, identity: &str) {
        self.buzz_queue.push(identity.to_string());
    }

    /// Removes the head of the buzz queue, returning false when empty
    pub fn pop_first_buzz(&mut self) -> bool {
        if self.buzz_queue.is_empty() {
            return false;
        }
        self.buzz_queue.remove(0);
        true
    }

    pub fn is_ready(&self, identity: &str) -> bool {
        self.ready_set.iter().any(|id| id == identity)
    }

    pub fn add_ready(&mut self, identity: &str) {
        self.ready_set.push(identity.to_string());
    }

    pub fn remove_ready(&mut self, identity: &str) {
        self.ready_set.retain(|id| id != identity);
    }

    /// Clears the buzz queue and the ready set
    pub fn release(&mut self) {
        self.buzz_queue.clear();
        self.ready_set.clear();
    }

    /// Removes an identity from the buzz queue and ready set only
    pub fn remove_from_sets(&mut self, identity: &str) {
        self.buzz_queue.retain(|id| id != identity);
        self.ready_set.retain(|id| id != identity);
    }

    /// Read-only projection of display names, exactly what goes on the wire
    pub fn snapshot(&self) -> GameState {
        GameState {
            players: self.roster.iter().map(|p| p.display_name.clone()).collect(),
            buzzed_players: self.names_of(&self.buzz_queue),
            ready_players: self.names_of(&self.ready_set),
        }
    }

    fn names_of(&self, identities: &[String]) -> Vec<String> {
        identities
            .iter()
            .filter_map(|id| self.find_player(id).map(|p| p.display_name.clone()))
            .collect()
    }
}
