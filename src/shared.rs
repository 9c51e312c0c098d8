use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::room::directory::RoomDirectory;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn RoomDirectory + Send + Sync>,
}

impl AppState {
    pub fn new(directory: Arc<dyn RoomDirectory + Send + Sync>) -> Self {
        Self { directory }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    #[error("player with id {0} not found")]
    PlayerNotFound(String),

    #[error("room with id {0} not found")]
    RoomNotFound(String),

    #[error("room with id {0} already exists")]
    RoomAlreadyExists(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) | AppError::UnknownEvent(_) => StatusCode::BAD_REQUEST,
            AppError::PlayerNotFound(_) | AppError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            AppError::RoomAlreadyExists(_) => StatusCode::CONFLICT,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
