//! GraphQL data client.
//!
//! All chat and message persistence belongs to the hosted GraphQL backend;
//! this module holds the query/mutation documents and a thin executor that
//! posts them with the caller's bearer token. There is no local cache or
//! normalization: every view re-fetches, every mutation is followed by a
//! re-fetch on the caller's side.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// A titled conversation thread owned by a user, messages oldest-first.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// A single authored entry within a chat. Authorship is decided per-view by
/// comparing `user_id` against the signed-in user; the automated responder
/// writes rows under the same id.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend executed the document and reported an error.
    #[error("{0}")]
    Graphql(String),
    /// The endpoint could not be reached or returned an unreadable response.
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    /// 2xx response with neither data nor errors.
    #[error("backend returned an empty response")]
    MissingData,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

const GET_USER_CHATS: &str = r"
    query GetUserChats($user_id: uuid!) {
      chatapp_chats(where: { user_id: { _eq: $user_id } }) {
        id
        title
        created_at
        messages(order_by: { created_at: asc }) {
          id
          chat_id
          content
          user_id
          created_at
        }
      }
    }
";

const CREATE_CHAT: &str = r"
    mutation CreateChat($user_id: uuid!, $title: String!) {
      insert_chatapp_chats_one(object: { user_id: $user_id, title: $title }) {
        id
        title
        created_at
      }
    }
";

const UPDATE_CHAT: &str = r"
    mutation UpdateChat($chat_id: uuid!, $title: String!) {
      update_chatapp_chats_by_pk(
        pk_columns: { id: $chat_id }
        _set: { title: $title }
      ) {
        id
        title
        created_at
      }
    }
";

const DELETE_CHAT: &str = r"
    mutation DeleteChat($chat_id: uuid!) {
      delete_chatapp_messages(where: { chat_id: { _eq: $chat_id } }) {
        affected_rows
      }
      delete_chatapp_chats_by_pk(id: $chat_id) {
        id
      }
    }
";

const INSERT_MESSAGE: &str = r"
    mutation SendMessage($chat_id: uuid!, $user_id: uuid!, $content: String!) {
      insert_chatapp_messages_one(
        object: { chat_id: $chat_id, user_id: $user_id, content: $content }
      ) {
        id
        chat_id
        content
        user_id
        created_at
      }
    }
";

#[derive(Debug, Deserialize)]
struct UserChatsData {
    chatapp_chats: Vec<Chat>,
}

#[derive(Debug, Deserialize)]
struct CreateChatData {
    insert_chatapp_chats_one: Chat,
}

#[derive(Debug, Deserialize)]
struct UpdateChatData {
    update_chatapp_chats_by_pk: Option<Chat>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DeleteChatData {
    delete_chatapp_messages: AffectedRows,
    delete_chatapp_chats_by_pk: Option<DeletedChat>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct AffectedRows {
    affected_rows: i64,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DeletedChat {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct InsertMessageData {
    insert_chatapp_messages_one: ChatMessage,
}

/// Client for the hosted GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    graphql_url: String,
}

impl BackendClient {
    #[must_use]
    pub fn new(graphql_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            graphql_url: graphql_url.into(),
        }
    }

    /// All chats for the user, each with its messages oldest-first (the
    /// ordering is part of the query document, never re-sorted locally).
    pub async fn user_chats(&self, token: &str, user_id: Uuid) -> Result<Vec<Chat>, BackendError> {
        let data: UserChatsData = self
            .execute(token, GET_USER_CHATS, json!({ "user_id": user_id }))
            .await?;
        Ok(data.chatapp_chats)
    }

    pub async fn create_chat(
        &self,
        token: &str,
        user_id: Uuid,
        title: &str,
    ) -> Result<Chat, BackendError> {
        let data: CreateChatData = self
            .execute(
                token,
                CREATE_CHAT,
                json!({ "user_id": user_id, "title": title }),
            )
            .await?;
        tracing::info!(name: "backend.chat.created", chat_id = %data.insert_chatapp_chats_one.id, "chat created");
        Ok(data.insert_chatapp_chats_one)
    }

    pub async fn rename_chat(
        &self,
        token: &str,
        chat_id: Uuid,
        title: &str,
    ) -> Result<Chat, BackendError> {
        let data: UpdateChatData = self
            .execute(
                token,
                UPDATE_CHAT,
                json!({ "chat_id": chat_id, "title": title }),
            )
            .await?;
        data.update_chatapp_chats_by_pk
            .ok_or_else(|| BackendError::Graphql("chat not found".to_string()))
    }

    /// Delete a chat and its messages in one document. The message deletion
    /// runs first so the chat row never outlives orphaned references.
    pub async fn delete_chat(&self, token: &str, chat_id: Uuid) -> Result<(), BackendError> {
        let _data: DeleteChatData = self
            .execute(token, DELETE_CHAT, json!({ "chat_id": chat_id }))
            .await?;
        tracing::info!(name: "backend.chat.deleted", chat_id = %chat_id, "chat deleted");
        Ok(())
    }

    /// Insert a message row. Used for both the user's message and the bot
    /// reply; the distinction is only in the content's provenance.
    pub async fn insert_message(
        &self,
        token: &str,
        chat_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, BackendError> {
        let data: InsertMessageData = self
            .execute(
                token,
                INSERT_MESSAGE,
                json!({ "chat_id": chat_id, "user_id": user_id, "content": content }),
            )
            .await?;
        Ok(data.insert_chatapp_messages_one)
    }

    /// Post a `{ query, variables }` document and unwrap the
    /// `{ data, errors }` envelope. A non-empty `errors` array wins over
    /// whatever partial data came with it.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, BackendError> {
        let resp = self
            .http
            .post(&self.graphql_url)
            .bearer_auth(token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .error_for_status()?;

        let envelope: GraphqlResponse<T> = resp.json().await?;
        if let Some(err) = envelope.errors.first() {
            tracing::warn!(name: "backend.graphql.error", message = %err.message, "backend reported an error");
            return Err(BackendError::Graphql(err.message.clone()));
        }
        envelope.data.ok_or(BackendError::MissingData)
    }
}
