//! Browser-based chat client.
//!
//! Users sign in, manage a list of conversations, and exchange messages
//! with an automated responder. Authentication, persistence and query
//! execution are delegated to an external identity/GraphQL backend, and
//! replies come from a third-party completion API; this process renders
//! the pages and sequences the calls.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server rendering HTML-first pages
//! - **Auth**: client for the hosted email/password identity service
//! - **Backend**: GraphQL-over-HTTP client for chats and messages
//! - **Assistant**: non-streaming completion client for bot replies
//!
//! # Modules
//!
//! - [`auth`]: identity API client
//! - [`backend`]: GraphQL data client
//! - [`assistant`]: completion API client
//! - [`session`]: cookie-keyed browser login sessions
//! - [`web`]: routes, handlers and pages

#![allow(clippy::unused_async)]

pub mod assistant;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod web;

use std::sync::Arc;

use crate::assistant::AssistantClient;
use crate::auth::AuthClient;
use crate::backend::BackendClient;
use crate::config::{AppConfig, AssistantSettings};
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
    /// Identity API client.
    pub auth: Arc<AuthClient>,
    /// GraphQL data client.
    pub backend: Arc<BackendClient>,
    /// Completion API client for bot replies.
    pub assistant: Arc<AssistantClient>,
    /// Browser login sessions.
    pub sessions: SessionStore,
}

impl AppState {
    #[must_use]
    pub fn new(config: Arc<AppConfig>, assistant: AssistantSettings) -> Self {
        Self {
            auth: Arc::new(AuthClient::new(config.backend.auth_url.clone())),
            backend: Arc::new(BackendClient::new(config.backend.graphql_url.clone())),
            assistant: Arc::new(AssistantClient::new(assistant)),
            sessions: SessionStore::new(),
            config,
        }
    }
}
