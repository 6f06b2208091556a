//! Completion API client for the automated responder.
//!
//! One non-streaming call per user message. This client never fails the
//! send sequence: configuration and transport problems degrade into an
//! apologetic reply string that is persisted like any other bot reply, so
//! the conversation keeps its shape even when the upstream is down.

use crate::config::AssistantSettings;

const SYSTEM_PROMPT: &str = "You are a helpful chatbot assistant.";

const MISSING_KEY_REPLY: &str = "Sorry, the assistant API key is not configured.";
const EMPTY_COMPLETION_REPLY: &str = "Sorry, I couldn't generate a response.";

#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    settings: AssistantSettings,
}

impl AssistantClient {
    #[must_use]
    pub fn new(settings: AssistantSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// Generate a reply to the user's message. Infallible by design: every
    /// failure mode maps to a reply string (see module docs).
    pub async fn reply(&self, user_message: &str) -> String {
        let Some(api_key) = self.settings.api_key.clone() else {
            tracing::warn!(name: "assistant.unconfigured", "no assistant API key configured");
            return MISSING_KEY_REPLY.to_string();
        };

        match self.request_completion(&api_key, user_message).await {
            Ok(Some(text)) => text,
            Ok(None) => EMPTY_COMPLETION_REPLY.to_string(),
            Err(e) => {
                tracing::error!(name: "assistant.failed", error = %e, "completion request failed");
                format!("Sorry, I'm having trouble responding right now. Error: {e}")
            }
        }
    }

    async fn request_completion(
        &self,
        api_key: &str,
        user_message: &str,
    ) -> Result<Option<String>, reqwest::Error> {
        let url = format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_message }
            ],
            "max_tokens": 150,
            "temperature": 0.7
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.settings.referer)
            .header("X-Title", "Chat App")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let v: serde_json::Value = resp.json().await?;
        let content = v["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        tracing::debug!(
            name: "assistant.completed",
            model = %self.settings.model,
            has_content = content.is_some(),
            "completion response received"
        );
        Ok(content)
    }
}
