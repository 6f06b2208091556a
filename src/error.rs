//! Application-level error surface.
//!
//! Every failure reaches the user directly: expired or missing sessions
//! bounce back to the sign-in page, anything the backend refuses or drops
//! renders the blocking error page with the underlying message. Identity
//! failures never get here; the sign-in/sign-up forms re-render themselves
//! with the message inline. Nothing is retried automatically.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::backend::BackendError;
use crate::web::pages;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// No valid session cookie on an authenticated route.
    #[error("session expired")]
    SessionExpired,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::SessionExpired => Redirect::to("/").into_response(),
            Self::Backend(e) => blocking_error(&e.to_string()),
        }
    }
}

/// The alert() of this application: a full page naming the failure, with a
/// way back to the chat screen.
fn blocking_error(message: &str) -> Response {
    tracing::error!(name: "web.error", message = %message, "surfacing failure to user");
    (StatusCode::BAD_GATEWAY, Html(pages::error_page(message))).into_response()
}
