//! CLI argument definitions for the ragchat terminal client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use ragchat_core::RagchatConfig;

/// ragchat: chat with a RAG/NLQ backend from the terminal.
#[derive(Parser, Debug, Default)]
#[command(name = "ragchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the query/upload API.
    #[arg(short = 'a', long = "api-url")]
    pub api_url: Option<String>,

    /// Realtime socket server URL.
    #[arg(short = 's', long = "socket-url")]
    pub socket_url: Option<String>,

    /// Auth token for the realtime channel.
    #[arg(short = 't', long = "token")]
    pub token: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Connect the realtime channel even without a token.
    #[arg(long = "realtime")]
    pub realtime: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > RAGCHAT_CONFIG env var > ~/.ragchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env_var("RAGCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Fold flags and environment overrides into a loaded config.
    pub fn apply(&self, config: &mut RagchatConfig) {
        self.apply_with_env(config, env_var);
    }

    fn apply_with_env<F>(&self, config: &mut RagchatConfig, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = pick(self.api_url.as_deref(), env("RAGCHAT_API_URL")) {
            config.api.base_url = url;
        }
        if let Some(url) = pick(self.socket_url.as_deref(), env("RAGCHAT_SOCKET_URL")) {
            config.realtime.endpoint = url;
        }
        if let Some(token) = pick(self.token.as_deref(), env("RAGCHAT_SOCKET_TOKEN")) {
            config.realtime.token = Some(token);
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.realtime {
            config.realtime.auto_connect = true;
        }
    }
}

/// Flag value, else env value. Blank values count as unset.
fn pick(flag: Option<&str>, env: Option<String>) -> Option<String> {
    flag.map(str::to_string)
        .or(env)
        .filter(|v| !v.trim().is_empty())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    ragchat_core::config::expand_home("~/.ragchat/config.toml")
}
