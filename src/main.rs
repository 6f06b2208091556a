//! Chat client entry point.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use chatapp::config::{self, AppConfig};
use chatapp::server;

#[tokio::main]
async fn main() {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let app_config = match AppConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let assistant = config::load_assistant_settings();

    tracing::info!(
        name: "config.loaded",
        auth_url = %app_config.backend.auth_url,
        graphql_url = %app_config.backend.graphql_url,
        model = %assistant.model,
        assistant_configured = assistant.api_key.is_some(),
        "configuration loaded"
    );

    if let Err(e) = server::start_server(app_config, assistant).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
