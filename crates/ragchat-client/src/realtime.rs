//! Authenticated push channel to the Socket.IO server.
//!
//! The channel is an owned object built from configuration. Authentication is
//! set (or reset) through [`RealtimeChannel::authenticate`]; nothing connects
//! until [`RealtimeChannel::connect`] is called.

use std::sync::LazyLock;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use regex::Regex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ragchat_core::config::RealtimeSettings;

use crate::error::ApiError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Three dot-separated base64url segments (signed-token shape).
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$").expect("Invalid token regex")
});

const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// Whether `token` has the shape of a signed token.
pub fn is_valid_token(token: &str) -> bool {
    TOKEN_RE.is_match(token)
}

/// Connection settings for the realtime channel.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Server URL; `http(s)://` is rewritten to `ws(s)://`.
    pub endpoint: String,
    /// Upper bound for the whole connect handshake.
    pub handshake_timeout: Duration,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::from(&RealtimeSettings::default())
    }
}

impl From<&RealtimeSettings> for RealtimeConfig {
    fn from(settings: &RealtimeSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// A server-pushed event.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeEvent {
    pub name: String,
    pub payload: Vec<Value>,
}

// =============================================================================
// RealtimeChannel
// =============================================================================

/// Owned, not-yet-connected socket channel.
#[derive(Debug, Clone)]
pub struct RealtimeChannel {
    config: RealtimeConfig,
    token: Option<String>,
}

impl RealtimeChannel {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            config,
            token: None,
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Set the auth token used by the next `connect`.
    ///
    /// A malformed token is rejected: the auth payload is reset to empty and
    /// `false` is returned. The channel stays usable unauthenticated.
    pub fn authenticate(&mut self, token: &str) -> bool {
        if is_valid_token(token) {
            let preview: String = token.chars().take(20).collect();
            tracing::info!(token = %preview, "Realtime auth token set");
            self.token = Some(token.to_string());
            true
        } else {
            tracing::warn!("Invalid token format for realtime channel; connecting without auth");
            self.token = None;
            false
        }
    }

    pub fn clear_auth(&mut self) {
        self.token = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Auth object sent in the Socket.IO connect packet.
    pub fn auth_payload(&self) -> Value {
        match &self.token {
            Some(token) => json!({ "token": token }),
            None => json!({}),
        }
    }

    /// WebSocket URL of the Engine.IO v4 transport.
    pub fn socket_url(&self) -> Result<String, ApiError> {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        let base = if let Some(rest) = endpoint.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else if let Some(rest) = endpoint.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            endpoint.to_string()
        } else {
            return Err(ApiError::Realtime(format!(
                "unsupported endpoint scheme: {}",
                self.config.endpoint
            )));
        };
        Ok(format!("{}{}", base, SOCKET_PATH))
    }

    /// Open the socket and complete the Socket.IO connect handshake.
    pub async fn connect(&self) -> Result<RealtimeConnection, ApiError> {
        let url = self.socket_url()?;
        tracing::info!(url = %url, authenticated = self.is_authenticated(), "Connecting realtime channel");

        match tokio::time::timeout(self.config.handshake_timeout, self.handshake(&url)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Realtime("handshake timed out".to_string())),
        }
    }

    async fn handshake(&self, url: &str) -> Result<RealtimeConnection, ApiError> {
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| ApiError::Realtime(e.to_string()))?;

        let open = next_text(&mut ws)
            .await?
            .ok_or_else(|| ApiError::Realtime("connection closed before open".to_string()))?;
        if !open.starts_with('0') {
            return Err(ApiError::Realtime(format!("unexpected open packet: {}", open)));
        }

        send_text(&mut ws, format!("40{}", self.auth_payload())).await?;

        loop {
            let packet = next_text(&mut ws)
                .await?
                .ok_or_else(|| ApiError::Realtime("connection closed during connect".to_string()))?;

            if packet == "2" {
                send_text(&mut ws, "3".to_string()).await?;
            } else if let Some(rest) = packet.strip_prefix("40") {
                let sid = serde_json::from_str::<Value>(rest)
                    .ok()
                    .and_then(|v| v.get("sid").and_then(Value::as_str).map(str::to_string));
                tracing::info!(sid = ?sid, "Realtime channel connected");
                return Ok(RealtimeConnection { ws, sid });
            } else if let Some(rest) = packet.strip_prefix("44") {
                return Err(ApiError::Realtime(format!("connect rejected: {}", rest)));
            } else {
                tracing::debug!(packet = %packet, "Ignoring packet during handshake");
            }
        }
    }
}

// =============================================================================
// RealtimeConnection
// =============================================================================

/// A connected Socket.IO session.
pub struct RealtimeConnection {
    ws: WsStream,
    sid: Option<String>,
}

impl RealtimeConnection {
    /// Session id assigned by the server.
    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Wait for the next event. Pings are answered transparently.
    ///
    /// Returns `None` once the server disconnects or closes the socket.
    pub async fn next_event(&mut self) -> Result<Option<RealtimeEvent>, ApiError> {
        loop {
            let Some(packet) = next_text(&mut self.ws).await? else {
                return Ok(None);
            };
            match packet.as_str() {
                "2" => send_text(&mut self.ws, "3".to_string()).await?,
                "1" | "41" => return Ok(None),
                _ => {
                    if let Some(event) = parse_event(&packet) {
                        return Ok(Some(event));
                    }
                    tracing::debug!(packet = %packet, "Ignoring realtime packet");
                }
            }
        }
    }

    /// Send the disconnect packet and close the socket.
    pub async fn close(mut self) -> Result<(), ApiError> {
        send_text(&mut self.ws, "41".to_string()).await?;
        self.ws
            .close(None)
            .await
            .map_err(|e| ApiError::Realtime(e.to_string()))
    }
}

/// Parse a `42[...]` event packet (optionally with an ack id).
pub fn parse_event(packet: &str) -> Option<RealtimeEvent> {
    let rest = packet.strip_prefix("42")?;
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let Value::Array(mut items) = serde_json::from_str(rest).ok()? else {
        return None;
    };
    if items.is_empty() {
        return None;
    }
    let name = match items.remove(0) {
        Value::String(name) => name,
        _ => return None,
    };
    Some(RealtimeEvent {
        name,
        payload: items,
    })
}

async fn send_text(ws: &mut WsStream, text: String) -> Result<(), ApiError> {
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| ApiError::Realtime(e.to_string()))
}

/// Next text frame, skipping control and binary frames. `None` on close.
async fn next_text(ws: &mut WsStream) -> Result<Option<String>, ApiError> {
    while let Some(frame) = ws.next().await {
        match frame.map_err(|e| ApiError::Realtime(e.to_string()))? {
            Message::Text(text) => return Ok(Some(text.as_str().to_string())),
            Message::Close(_) => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}
