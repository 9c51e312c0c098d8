use axum::{
    routing::{get, post},
    Router,
};
use buzzroom::room;
use buzzroom::{AppState, InMemoryRoomDirectory};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buzzroom=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting buzzer relay server");

    // Room directory is owned here and injected into the handlers
    let directory = Arc::new(InMemoryRoomDirectory::new());
    let app_state = AppState::new(directory);

    let app = Router::new()
        .route("/", get(|| async { "buzzroom relay server" }))
        .route("/api/lobby", post(room::create_room))
        .route("/api/lobby/:id/events", post(room::submit_event))
        .route("/api/stream/:id", get(room::stream_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
