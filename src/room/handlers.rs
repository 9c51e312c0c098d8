use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Form, Json,
};
use futures::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::directory::RoomDirectory;
use super::events::{ClientEvent, ServerEvent};
use super::handle::RoomHandle;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateRoomForm {
    /// Identity of the caller, becomes the room owner
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub id: Option<String>,
}

/// HTTP handler for creating a new room
///
/// POST /api/lobby
/// Allocates a fresh room id and redirects to the room page.
#[instrument(name = "create_room", skip(state))]
pub async fn create_room(
    State(state): State<AppState>,
    Form(form): Form<CreateRoomForm>,
) -> Result<impl IntoResponse, AppError> {
    let room_id = Uuid::new_v4().to_string();
    state.directory.create_room(&room_id, &form.id).await?;

    info!(room_id = %room_id, "Room created, redirecting owner");

    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, format!("/buzzer/{}", room_id))],
    ))
}

/// HTTP handler for submitting an event to a room
///
/// POST /api/lobby/{id}/events
/// The acknowledgement is empty; effects are observed on the stream.
#[instrument(name = "submit_event", skip(state, body))]
pub async fn submit_event(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<StatusCode, AppError> {
    let triggerer = body
        .get("triggerer")
        .and_then(serde_json::Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("missing 'triggerer' field".to_string()))?
        .to_string();

    let room = state.directory.get_room(&room_id).await?;
    let event = ClientEvent::parse(body)?;
    room.process_event(&triggerer, event)?;

    Ok(StatusCode::NO_CONTENT)
}

/// HTTP handler for opening a room event stream
///
/// GET /api/stream/{id}?id=<identity>
/// Pushes a GAME_STATE snapshot right away (plus IS_ADMIN for the owner),
/// then streams events as they happen. Closing the stream triggers the
/// leave sequence for the identity.
#[instrument(name = "stream_events", skip(state))]
pub async fn stream_events(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<EventStream>, AppError> {
    let identity = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("missing 'id' query parameter".to_string()))?;

    let room = state.directory.get_room(&room_id).await?;

    let (sender, receiver) = mpsc::unbounded_channel();
    room.subscribe(&identity, sender);

    let stream = EventStream {
        receiver,
        _guard: DisconnectGuard { room, identity },
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Delivery channel as seen by the transport: one SSE frame per event
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<ServerEvent>,
    _guard: DisconnectGuard,
}

impl Stream for EventStream {
    type Item = Result<Event, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Event::default().json_data(&event))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Runs the leave sequence when the client side of a stream goes away
///
/// Dropping the SSE body is the only signal axum gives us for a closed
/// stream, and Drop runs exactly once, which is exactly the contract the
/// leave sequence needs.
struct DisconnectGuard {
    room: Arc<RoomHandle>,
    identity: String,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.room.disconnect(&self.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::directory::{InMemoryRoomDirectory, RoomDirectory};
    use crate::shared::test_utils::test_app_state;
    use axum::{
        body::Body,
        http::Request,
        routing::{get, post},
        Router,
    };
    use futures::StreamExt;
    use tower::ServiceExt; // for `oneshot`

    fn test_app(state: AppState) -> Router {
        Router::new()
            .route("/api/lobby", post(create_room))
            .route("/api/lobby/:id/events", post(submit_event))
            .route("/api/stream/:id", get(stream_events))
            .with_state(state)
    }

    async fn app_with_room() -> (Router, AppState, Arc<RoomHandle>) {
        let state = test_app_state();
        let room = state.directory.create_room("room-1", "owner-1").await.unwrap();
        (test_app(state.clone()), state, room)
    }

    fn submit_request(room_id: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/lobby/{}/events", room_id))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_room_redirects_to_room_page() {
        let state = test_app_state();
        let app = test_app(state.clone());

        let request = Request::builder()
            .method("POST")
            .uri("/api/lobby")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("id=owner-1"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let room_id = location.strip_prefix("/buzzer/").unwrap();

        // The redirect target must resolve to a registered room
        let room = state.directory.get_room(room_id).await.unwrap();
        assert_eq!(room.id(), room_id);
    }

    #[tokio::test]
    async fn test_submit_event_success_is_empty_ack() {
        let (app, _state, room) = app_with_room().await;

        let response = app
            .oneshot(submit_request(
                "room-1",
                r#"{"type": "JOIN_GAME", "triggerer": "p1", "name": "Alice"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(room.snapshot().players, vec!["Alice"]);
    }

    #[tokio::test]
    async fn test_submit_event_missing_triggerer() {
        let (app, _state, room) = app_with_room().await;

        let response = app
            .oneshot(submit_request(
                "room-1",
                r#"{"type": "JOIN_GAME", "name": "Alice"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(room.snapshot().players.is_empty());
    }

    #[tokio::test]
    async fn test_submit_event_unknown_type() {
        let (app, _state, _room) = app_with_room().await;

        let response = app
            .oneshot(submit_request(
                "room-1",
                r#"{"type": "TELEPORT", "triggerer": "p1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_submit_event_to_missing_room() {
        let state = test_app_state();
        let app = test_app(state);

        let response = app
            .oneshot(submit_request(
                "nowhere",
                r#"{"type": "BUZZ", "triggerer": "p1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_event_from_unknown_player() {
        let (app, _state, _room) = app_with_room().await;

        let response = app
            .oneshot(submit_request(
                "room-1",
                r#"{"type": "BUZZ", "triggerer": "stranger"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stream_requires_identity() {
        let (app, _state, _room) = app_with_room().await;

        let request = Request::builder()
            .method("GET")
            .uri("/api/stream/room-1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stream_for_missing_room() {
        let state = test_app_state();
        let app = test_app(state);

        let request = Request::builder()
            .method("GET")
            .uri("/api/stream/nowhere?id=p1")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stream_pushes_snapshot_frame_first() {
        let (app, _state, room) = app_with_room().await;
        room.process_event(
            "p1",
            ClientEvent::JoinGame {
                name: "Alice".to_string(),
            },
        )
        .unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/api/stream/room-1?id=watcher")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let frame = String::from_utf8(first.to_vec()).unwrap();
        assert!(frame.contains("GAME_STATE"), "got frame: {}", frame);
        assert!(frame.contains("Alice"));
    }

    #[tokio::test]
    async fn test_dropping_stream_triggers_leave_sequence() {
        let (app, _state, room) = app_with_room().await;
        room.process_event(
            "p1",
            ClientEvent::JoinGame {
                name: "Alice".to_string(),
            },
        )
        .unwrap();

        let request = Request::builder()
            .method("GET")
            .uri("/api/stream/room-1?id=p1")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(room.snapshot().players, vec!["Alice"]);

        drop(response);

        assert!(room.snapshot().players.is_empty());
    }

    #[tokio::test]
    async fn test_create_room_ids_are_unique() {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let state = AppState::new(directory);

        let mut locations = std::collections::HashSet::new();
        for _ in 0..3 {
            let app = test_app(state.clone());
            let request = Request::builder()
                .method("POST")
                .uri("/api/lobby")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("id=owner-1"))
                .unwrap();
            let response = app.oneshot(request).await.unwrap();
            let location = response
                .headers()
                .get(header::LOCATION)
                .unwrap()
                .to_str()
                .unwrap()
                .to_string();
            assert!(locations.insert(location));
        }
    }
}
