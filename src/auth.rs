//! Identity API client.
//!
//! Thin client for the hosted email/password identity service. All account
//! state lives on the service side; this module only exchanges credentials
//! for a token-bearing session and hands sign-out notices back.

use serde::Deserialize;
use uuid::Uuid;

/// Fallback shown when the identity service fails without a usable message.
const GENERIC_AUTH_ERROR: &str = "Something went wrong. Please try again.";

/// The signed-in user as reported by the identity service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A token-bearing session returned by sign-in (and some sign-up flows).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

/// Response envelope for the email/password endpoints. `session` is absent
/// when the service requires email verification before the first sign-in.
#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    session: Option<AuthSession>,
}

/// Error body the identity service attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The service processed the request and refused it (bad credentials,
    /// existing account, ...). Carries the service's own message, shown
    /// verbatim in the form's inline error slot.
    #[error("{0}")]
    Rejected(String),
    /// The service could not be reached or returned an unreadable response.
    #[error("identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for the Nhost-compatible identity endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    auth_url: String,
}

impl AuthClient {
    #[must_use]
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: auth_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.auth_url.trim_end_matches('/'))
    }

    /// Exchange email/password credentials for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let resp = self
            .http
            .post(self.endpoint("signin/email-password"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::rejection(resp).await);
        }

        let envelope: SessionEnvelope = resp.json().await?;
        let session = envelope.session.ok_or_else(|| {
            AuthError::Rejected("Sign-in did not return a session.".to_string())
        })?;

        tracing::info!(
            name: "auth.signin",
            user_id = %session.user.id,
            "user signed in"
        );
        Ok(session)
    }

    /// Register a new account. Returns the session when the service issues
    /// one immediately; `None` when email verification is pending. Either
    /// way the account exists and the caller routes back to sign-in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthError> {
        let resp = self
            .http
            .post(self.endpoint("signup/email-password"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::rejection(resp).await);
        }

        let envelope: SessionEnvelope = resp.json().await?;
        tracing::info!(name: "auth.signup", email = %email, "account created");
        Ok(envelope.session)
    }

    /// Invalidate the refresh token on the service side. Best-effort: the
    /// local session is discarded whether or not this call lands, so
    /// failures are logged and swallowed.
    pub async fn sign_out(&self, refresh_token: &str) {
        let result = self
            .http
            .post(self.endpoint("signout"))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        if let Err(e) = result {
            tracing::warn!(name: "auth.signout.failed", error = %e, "remote sign-out failed");
        }
    }

    /// Turn a non-2xx identity response into a `Rejected` error carrying the
    /// service's message, or the generic fallback when the body is opaque.
    async fn rejection(resp: reqwest::Response) -> AuthError {
        let status = resp.status();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_AUTH_ERROR.to_string()),
            Err(_) => GENERIC_AUTH_ERROR.to_string(),
        };
        tracing::debug!(name: "auth.rejected", status = %status, message = %message, "identity request rejected");
        AuthError::Rejected(message)
    }
}
