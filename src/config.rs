use std::env;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Host to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Base URL of the identity API
    #[arg(long, env = "AUTH_URL")]
    pub auth_url: Option<String>,

    /// URL of the GraphQL endpoint
    #[arg(long, env = "GRAPHQL_URL")]
    pub graphql_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Endpoints of the external identity/GraphQL backend. Both services are
/// owned by the hosted platform; this application is only a client.
#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub auth_url: String,
    pub graphql_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub timeout_minutes: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes * 60)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Defaults
        builder = builder
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("backend.auth_url", "http://localhost:1337/v1/auth")?
            .set_default("backend.graphql_url", "http://localhost:8080/v1/graphql")?
            .set_default("session.timeout_minutes", 30)?;

        // 2. Config file: --config / CONFIG_FILE, falling back to ./config.yaml
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }

        // 3. Environment variables (prefixed with CHATAPP_)
        // E.g. CHATAPP_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("CHATAPP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // 4. Manual CLI overrides (clap also resolves the bare env vars
        // declared on the flags, so PORT=8000 lands here too)
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(url) = cli.auth_url {
            builder = builder.set_override("backend.auth_url", url)?;
        }
        if let Some(url) = cli.graphql_url {
            builder = builder.set_override("backend.graphql_url", url)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

/// Completion-API settings for the automated responder.
///
/// A missing key is not a startup error: the chat screen stays usable and
/// replies degrade to a canned apology until the key is configured.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// Base URL of the completion API (e.g. `https://openrouter.ai/api`).
    pub base_url: String,
    /// Bearer key for the completion API.
    pub api_key: Option<String>,
    /// Model identifier sent with every completion request.
    pub model: String,
    /// Value for the `HTTP-Referer` attribution header.
    pub referer: String,
}

pub fn load_assistant_settings() -> AssistantSettings {
    let base_url = env::var("ASSISTANT_BASE_URL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "https://openrouter.ai/api".to_string());

    let api_key = env::var("ASSISTANT_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());

    let model = env::var("ASSISTANT_MODEL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "openai/gpt-3.5-turbo".to_string());

    let referer = env::var("ASSISTANT_REFERER")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    AssistantSettings {
        base_url,
        api_key,
        model,
        referer,
    }
}
