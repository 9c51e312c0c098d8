use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shared::AppError;

/// Point-in-time projection of a room, display names only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: Vec<String>,
    pub buzzed_players: Vec<String>,
    pub ready_players: Vec<String>,
}

/// Events a client submits to a room
///
/// Each variant carries only its own fields; the `triggerer` identity rides
/// alongside in the request body and is validated by the HTTP layer before
/// the engine ever sees the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEvent {
    JoinGame { name: String },
    AskGameState,
    NameChanged { name: String },
    Buzz,
    Ready,
    NotReady,
    ReleaseBuzzer,
    PopFirstBuzzer,
}

/// Event types accepted from clients, used to tell an unknown discriminator
/// apart from a malformed payload for a known one
const CLIENT_EVENT_TYPES: [&str; 8] = [
    "JOIN_GAME",
    "ASK_GAME_STATE",
    "NAME_CHANGED",
    "BUZZ",
    "READY",
    "NOT_READY",
    "RELEASE_BUZZER",
    "POP_FIRST_BUZZER",
];

impl ClientEvent {
    /// Parses a submitted event body into a typed event
    ///
    /// Unknown `type` discriminators fail with `UnknownEvent`; a known type
    /// with missing or malformed fields fails with `Validation`.
    pub fn parse(body: Value) -> Result<Self, AppError> {
        let event_type = body
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("missing 'type' field".to_string()))?;

        if !CLIENT_EVENT_TYPES.contains(&event_type) {
            return Err(AppError::UnknownEvent(event_type.to_string()));
        }

        serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
    }
}

/// Events pushed to subscribers, one self-contained message per event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    GameState {
        #[serde(flatten)]
        state: GameState,
    },
    JoinGame {
        name: String,
    },
    LeaveGame {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    NameChanged {
        previous_name: String,
        name: String,
    },
    Buzz {
        triggerer: String,
    },
    Ready {
        player: String,
    },
    NotReady {
        player: String,
    },
    ReleaseBuzzer,
    PopFirstBuzzer,
    IsAdmin,
}
