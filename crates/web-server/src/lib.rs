// In crates/web-server/src/lib.rs

use app_config::types::ServerSettings;
use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use core_types::SessionId;
use engine::{Scheduler, SessionStatus};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use types::StopResponse;

pub mod error;
pub mod types;

// Re-export our custom error type for convenience.
pub use error::{Error, Result};

/// The shared application state that is available to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
}

/// Creates the main application router with all routes and middleware.
pub fn create_router(app_state: AppState) -> Router {
    // The control surface is read by chat front ends and dashboards alike.
    let cors = tower_http::cors::CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    let api_router = Router::new()
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{id}", get(session_status_handler))
        .route("/sessions/{id}/start", post(start_session_handler))
        .route("/sessions/{id}/stop", post(stop_session_handler));

    Router::new()
        .route("/", get(alive_handler))
        .route("/health", get(health_check_handler))
        .nest("/api", api_router)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Liveness text for uptime pingers.
async fn alive_handler() -> &'static str {
    "I am alive and trading!"
}

async fn health_check_handler() -> &'static str {
    "OK"
}

/// Handler for `GET /api/sessions`
async fn list_sessions_handler(State(state): State<AppState>) -> Json<Vec<SessionStatus>> {
    Json(state.scheduler.sessions().await)
}

/// Handler for `GET /api/sessions/{id}`. Unknown sessions report as stopped.
async fn session_status_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Json<SessionStatus> {
    Json(state.scheduler.status(SessionId(id)).await)
}

/// Handler for `POST /api/sessions/{id}/start`
async fn start_session_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SessionStatus>> {
    let status = state.scheduler.start(SessionId(id)).await?;
    Ok(Json(status))
}

/// Handler for `POST /api/sessions/{id}/stop`
async fn stop_session_handler(State(state): State<AppState>, Path(id): Path<i64>) -> Json<StopResponse> {
    let was_running = state.scheduler.stop(SessionId(id)).await;
    Json(StopResponse { was_running })
}

/// The main entry point for running the web server.
///
/// Serves until `shutdown` is cancelled, then lets in-flight requests finish.
pub async fn run(settings: ServerSettings, scheduler: Arc<Scheduler>, shutdown: CancellationToken) -> Result<()> {
    let app = create_router(AppState { scheduler });

    let address = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&address).await.map_err(Error::ServerBindError)?;
    tracing::info!("Web server listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(Error::ServeError)?;

    tracing::info!("Web server stopped.");
    Ok(())
}
