//! Web layer: routes, handlers and server-rendered pages.
//!
//! - [`auth`]: sign-in / sign-up / sign-out handlers
//! - [`chats`]: the chat screen and its mutations
//! - [`pages`]: HTML shells and fragments

pub mod auth;
pub mod chats;
pub mod pages;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::AppState;
use crate::error::AppError;
use crate::session::Session;

/// Name of the browser session cookie.
pub const SESSION_COOKIE: &str = "chatapp_session";

/// Build the session cookie. HttpOnly: nothing client-side reads it.
pub(crate) fn session_cookie(id: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Resolve the cookie to a live session, if any. Expired sessions are
/// evicted on the spot rather than waiting for the sweeper.
pub(crate) fn lookup_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    let id = jar.get(SESSION_COOKIE)?.value().to_string();
    let session = state.sessions.get(&id)?;
    if session.is_expired_with_timeout(state.config.session.timeout()) {
        state.sessions.remove(&id);
        return None;
    }
    session.touch();
    Some(session)
}

/// Like [`lookup_session`], but an absent session is the error that routes
/// back to the sign-in page.
pub(crate) fn require_session(state: &AppState, jar: &CookieJar) -> Result<Session, AppError> {
    lookup_session(state, jar).ok_or(AppError::SessionExpired)
}
