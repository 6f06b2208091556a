//! Server startup and routing.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::{AppConfig, AssistantSettings};
use crate::web;

/// How often idle sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on any single request, outbound calls included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router. Public so tests can drive the real
/// routing against stub services.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web::auth::sign_in_page))
        .route("/login", post(web::auth::sign_in_submit))
        .route(
            "/signup",
            get(web::auth::sign_up_page).post(web::auth::sign_up_submit),
        )
        .route("/logout", post(web::auth::sign_out))
        .route(
            "/chats",
            get(web::chats::chats_screen).post(web::chats::create_chat),
        )
        .route("/chats/{id}/rename", post(web::chats::rename_chat))
        .route("/chats/{id}/delete", post(web::chats::delete_chat))
        .route("/chats/{id}/messages", post(web::chats::send_message))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(
    config: Arc<AppConfig>,
    assistant: AssistantSettings,
) -> anyhow::Result<()> {
    let state = AppState::new(Arc::clone(&config), assistant);

    // Periodic sweep of idle browser sessions.
    let sessions = state.sessions.clone();
    let timeout = config.session.timeout();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(timeout);
            if removed > 0 {
                tracing::debug!(name: "session.sweep", removed, "expired sessions removed");
            }
        }
    });

    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
