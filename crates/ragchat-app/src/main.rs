//! ragchat binary - composition root.
//!
//! 1. Parse CLI flags and load the TOML configuration
//! 2. Install tracing on stderr
//! 3. Build the HTTP backend and load the theme preference
//! 4. Start the schema fetch and the realtime channel in the background
//! 5. Run the REPL until EOF or /quit

mod cli;
mod render;
mod repl;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

use ragchat_chat::{load_table_schemas, ConversationController, Uploader};
use ragchat_client::{
    Backend, HttpBackend, RealtimeChannel, RealtimeConfig, RealtimeConnection, TableSchemas,
};
use ragchat_core::config::{expand_home, RealtimeSettings};
use ragchat_core::{FileStore, RagchatConfig, ThemeStore};

use cli::CliArgs;
use render::{Line, Painter, Style};
use repl::Repl;

/// Print realtime events until the server disconnects or `shutdown` fires.
async fn realtime_loop(mut conn: RealtimeConnection, painter: Painter, shutdown: Arc<Notify>) {
    loop {
        let next = tokio::select! {
            next = conn.next_event() => next,
            _ = shutdown.notified() => break,
        };
        match next {
            Ok(Some(event)) => {
                tracing::debug!(event = %event.name, "Realtime event");
                let payload = serde_json::Value::Array(event.payload).to_string();
                painter.print(&[Line {
                    style: Style::Hint,
                    text: format!("[{}] {}", event.name, payload),
                }]);
            }
            Ok(None) => {
                tracing::info!("Realtime channel closed by server");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Realtime channel failed");
                return;
            }
        }
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "Realtime disconnect failed");
    }
}

/// Join the realtime channel in the background when a token is configured
/// or connection was requested. Connection failures are logged and the REPL
/// runs without it.
fn start_realtime(
    settings: &RealtimeSettings,
    painter: Painter,
    shutdown: Arc<Notify>,
) -> Option<JoinHandle<()>> {
    if settings.token.is_none() && !settings.auto_connect {
        return None;
    }
    let mut channel = RealtimeChannel::new(RealtimeConfig::from(settings));
    if let Some(ref token) = settings.token {
        channel.authenticate(token);
    }
    let endpoint = settings.endpoint.clone();
    Some(tokio::spawn(async move {
        let connected = tokio::select! {
            connected = channel.connect() => connected,
            _ = shutdown.notified() => return,
        };
        match connected {
            Ok(conn) => {
                tracing::info!(sid = ?conn.sid(), endpoint = %endpoint, "Realtime channel connected");
                realtime_loop(conn, painter, shutdown).await;
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Realtime channel unavailable");
            }
        }
    }))
}

/// Fetch table schemas in the background; the REPL picks them up when ready.
fn start_schema_fetch(backend: Arc<dyn Backend>) -> oneshot::Receiver<Option<TableSchemas>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let tables = load_table_schemas(backend.as_ref()).await;
        // The REPL may already be gone.
        let _ = tx.send(tables);
    });
    rx
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match RagchatConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (RagchatConfig::default(), Some(e)),
    };
    args.apply(&mut config);

    // Tracing. RUST_LOG wins over the resolved log level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting ragchat v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid config, using defaults")
        }
        Some(_) => tracing::debug!(path = %config_file.display(), "No config file, using defaults"),
    }

    // Backend.
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config.api)?);
    tracing::info!(base_url = %config.api.base_url, "Backend configured");

    // Preferences.
    let prefs_path = expand_home(&config.general.prefs_path);
    let theme = ThemeStore::load(FileStore::new(prefs_path));
    let painter = Painter::new(theme.current());

    // Background startup work; neither delays the first prompt.
    let schemas = start_schema_fetch(Arc::clone(&backend));
    let shutdown = Arc::new(Notify::new());
    let realtime = start_realtime(&config.realtime, painter, Arc::clone(&shutdown));

    let mut repl = Repl::new(
        Arc::clone(&backend),
        ConversationController::new(),
        Uploader::from_config(&config.upload),
        theme,
        Duration::from_secs(config.logs.poll_interval_secs.max(1)),
    )
    .with_pending_schemas(schemas);
    repl.run().await?;

    if let Some(task) = realtime {
        shutdown.notify_one();
        if let Err(e) = task.await {
            tracing::debug!(error = %e, "Realtime task ended abnormally");
        }
    }

    Ok(())
}
