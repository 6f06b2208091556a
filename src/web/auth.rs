//! Sign-in, sign-up and sign-out handlers.
//!
//! Failures from the identity service re-render the same form with the
//! service's message in the inline error slot; nothing here retries.

use axum::Form;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{SESSION_COOKIE, lookup_session, pages, session_cookie};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

/// GET / - sign-in page. Already signed in means straight to the chats.
pub async fn sign_in_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if lookup_session(&state, &jar).is_some() {
        return Redirect::to("/chats").into_response();
    }
    Html(pages::sign_in_page(None, "")).into_response()
}

/// POST /login - exchange credentials for a session cookie.
pub async fn sign_in_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let email = form.email.trim();
    match state.auth.sign_in(email, &form.password).await {
        Ok(auth) => {
            let session = state.sessions.insert(auth);
            tracing::debug!(
                name: "web.session.created",
                session_id = %session.id(),
                "browser session created"
            );
            let jar = jar.add(session_cookie(session.id()));
            (jar, Redirect::to("/chats")).into_response()
        }
        Err(e) => Html(pages::sign_in_page(Some(&e.to_string()), email)).into_response(),
    }
}

/// GET /signup - sign-up page.
pub async fn sign_up_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if lookup_session(&state, &jar).is_some() {
        return Redirect::to("/chats").into_response();
    }
    Html(pages::sign_up_page(None, "")).into_response()
}

/// POST /signup - create the account, then route to sign-in. The account
/// is not auto-signed-in even when the service returns a session, so
/// verification-required configurations behave the same as instant ones.
pub async fn sign_up_submit(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let email = form.email.trim();
    match state.auth.sign_up(email, &form.password).await {
        Ok(_) => Redirect::to("/").into_response(),
        Err(e) => Html(pages::sign_up_page(Some(&e.to_string()), email)).into_response(),
    }
}

/// POST /logout - discard the local session, notify the identity service
/// best-effort, clear the cookie.
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let id = cookie.value().to_string();
        if let Some(session) = state.sessions.remove(&id) {
            state.auth.sign_out(session.refresh_token()).await;
            tracing::debug!(name: "web.session.removed", session_id = %id, "browser session removed");
        }
    }
    let jar = jar.remove(session_cookie(""));
    (jar, Redirect::to("/")).into_response()
}
