//! Chat screen handlers: list/select, create, rename, delete, send.
//!
//! Every mutation is delegated to the external backend and followed by a
//! re-fetch; the handlers own no conversation state. Empty titles and
//! messages are no-ops before any network call happens.

use axum::Form;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use super::{pages, require_session};
use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChatSelection {
    #[serde(default)]
    pub chat: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TitleForm {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub message: String,
}

/// GET /chats - the chat screen. A failed fetch renders the error banner
/// with the manual Retry affordance instead of a blocking error.
pub async fn chats_screen(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(selection): Query<ChatSelection>,
) -> Result<Response, AppError> {
    let session = require_session(&state, &jar)?;

    match state
        .backend
        .user_chats(session.access_token(), session.user().id)
        .await
    {
        Ok(chats) => {
            let selected = selection.chat.and_then(|id| chats.iter().find(|c| c.id == id));
            tracing::debug!(
                name: "web.chats.rendered",
                chat_count = chats.len(),
                selected = selected.is_some(),
                "chat screen rendered"
            );
            Ok(Html(pages::chats_page(session.user(), &chats, selected)).into_response())
        }
        Err(e) => Ok(Html(pages::chats_fetch_error_page(&e.to_string())).into_response()),
    }
}

/// POST /chats - create a chat and select it. Blank title is a no-op.
pub async fn create_chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<TitleForm>,
) -> Result<Response, AppError> {
    let session = require_session(&state, &jar)?;
    let title = form.title.trim();
    if title.is_empty() {
        return Ok(Redirect::to("/chats").into_response());
    }

    let chat = state
        .backend
        .create_chat(session.access_token(), session.user().id, title)
        .await?;
    Ok(Redirect::to(&format!("/chats?chat={}", chat.id)).into_response())
}

/// POST /chats/{id}/rename - update the title. Blank title is a no-op.
pub async fn rename_chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(chat_id): Path<Uuid>,
    Form(form): Form<TitleForm>,
) -> Result<Response, AppError> {
    let session = require_session(&state, &jar)?;
    let back = format!("/chats?chat={chat_id}");
    let title = form.title.trim();
    if title.is_empty() {
        return Ok(Redirect::to(&back).into_response());
    }

    state
        .backend
        .rename_chat(session.access_token(), chat_id, title)
        .await?;
    Ok(Redirect::to(&back).into_response())
}

/// POST /chats/{id}/delete - delete the chat and its messages; selection
/// falls back to the welcome panel.
pub async fn delete_chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(chat_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = require_session(&state, &jar)?;
    state
        .backend
        .delete_chat(session.access_token(), chat_id)
        .await?;
    Ok(Redirect::to("/chats").into_response())
}

/// POST /chats/{id}/messages - the send sequence, strictly ordered:
/// persist the user message, request the completion, persist the bot
/// reply, then re-fetch and return the re-rendered messages region.
///
/// A blank message is a no-op (204, nothing swapped). Step failures land
/// in the region as a flash banner; the completion step cannot fail.
pub async fn send_message(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(chat_id): Path<Uuid>,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let session = require_session(&state, &jar)?;
    let content = form.message.trim();
    if content.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let token = session.access_token();
    let user_id = session.user().id;

    let mut flash = None;
    match state
        .backend
        .insert_message(token, chat_id, user_id, content)
        .await
    {
        Ok(_) => {
            let reply = state.assistant.reply(content).await;
            if let Err(e) = state
                .backend
                .insert_message(token, chat_id, user_id, &reply)
                .await
            {
                flash = Some(format!("Error inserting bot reply: {e}"));
            }
        }
        Err(e) => flash = Some(format!("Error sending message: {e}")),
    }

    // Re-synchronize against server state; whatever the backend now holds
    // is the truth the region re-renders from.
    match state.backend.user_chats(token, user_id).await {
        Ok(chats) => match chats.iter().find(|c| c.id == chat_id) {
            Some(chat) => {
                Ok(Html(pages::messages_region(user_id, chat, flash.as_deref())).into_response())
            }
            None => Ok(Html(pages::region_error("This chat no longer exists.")).into_response()),
        },
        Err(e) => Ok(Html(pages::region_error(&e.to_string())).into_response()),
    }
}
