//! Interactive read-eval-print loop.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;

use ragchat_chat::{ConversationController, LogPoller, LogPollerHandle, Uploader};
use ragchat_client::{Backend, TableSchemas};
use ragchat_core::{KeyValueStore, ThemeStore};

use crate::render::{self, Line, Painter, Style};

const HELP: &str = "\
Commands:
  <text>                 ask the backend
  /column <name>         pick a column for the pending clarification
  /upload <path>...      upload PDF or CSV documents
  /tables                list table schemas
  /logs start|stop|show  manage the backend log viewer
  /theme                 toggle light/dark theme
  /help                  show this help
  /quit                  exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogsAction {
    Start,
    Stop,
    Show,
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Column(String),
    Upload(Vec<PathBuf>),
    Tables,
    Logs(LogsAction),
    Theme,
    Help,
    Quit,
    /// Known command with bad arguments; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    /// Parse one input line. Blank lines give `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.starts_with('/') {
            return Some(Command::Ask(line.trim_end_matches(['\r', '\n']).to_string()));
        }

        let (name, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (trimmed, ""),
        };
        let command = match name {
            "/column" if rest.is_empty() => Command::Usage("/column <name>"),
            "/column" => Command::Column(rest.to_string()),
            "/upload" if rest.is_empty() => Command::Usage("/upload <path>..."),
            "/upload" => Command::Upload(rest.split_whitespace().map(PathBuf::from).collect()),
            "/tables" => Command::Tables,
            "/logs" => match rest {
                "start" => Command::Logs(LogsAction::Start),
                "stop" => Command::Logs(LogsAction::Stop),
                "" | "show" => Command::Logs(LogsAction::Show),
                _ => Command::Usage("/logs start|stop|show"),
            },
            "/theme" => Command::Theme,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// REPL state: the conversation plus the side panels.
pub struct Repl<S: KeyValueStore> {
    backend: Arc<dyn Backend>,
    controller: ConversationController,
    uploader: Uploader,
    theme: ThemeStore<S>,
    painter: Painter,
    poll_interval: Duration,
    poller: Option<LogPollerHandle>,
    pending_schemas: Option<oneshot::Receiver<Option<TableSchemas>>>,
}

impl<S: KeyValueStore> Repl<S> {
    pub fn new(
        backend: Arc<dyn Backend>,
        controller: ConversationController,
        uploader: Uploader,
        theme: ThemeStore<S>,
        poll_interval: Duration,
    ) -> Self {
        let painter = Painter::new(theme.current());
        Self {
            backend,
            controller,
            uploader,
            theme,
            painter,
            poll_interval,
            poller: None,
            pending_schemas: None,
        }
    }

    /// Take table schemas from a background fetch once it completes.
    pub fn with_pending_schemas(mut self, rx: oneshot::Receiver<Option<TableSchemas>>) -> Self {
        self.pending_schemas = Some(rx);
        self
    }

    /// Store the background schema map if it has arrived. Never waits.
    fn poll_schemas(&mut self) {
        let Some(rx) = self.pending_schemas.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(Some(tables)) => {
                self.controller.set_table_schemas(tables);
                self.pending_schemas = None;
            }
            Ok(None) | Err(oneshot::error::TryRecvError::Closed) => self.pending_schemas = None,
            Err(oneshot::error::TryRecvError::Empty) => {}
        }
    }

    /// Read stdin until EOF or `/quit`.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.say(Style::Hint, "Type a question, or /help for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            if !self.handle(command).await {
                break;
            }
        }
        self.stop_logs().await;
        Ok(())
    }

    /// Execute one command. Returns `false` when the loop should end.
    pub async fn handle(&mut self, command: Command) -> bool {
        self.poll_schemas();
        match command {
            Command::Ask(text) => self.ask(&text).await,
            Command::Column(column) => {
                if self.controller.select_clarification_column(&column) {
                    self.show_clarification();
                } else {
                    self.say(Style::Hint, "No clarification is pending.");
                }
            }
            Command::Upload(paths) => self.upload(&paths).await,
            Command::Tables => self.show_tables(),
            Command::Logs(action) => self.logs(action).await,
            Command::Theme => self.toggle_theme(),
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
            Command::Usage(usage) => self.say(Style::Hint, format!("Usage: {}", usage)),
            Command::Unknown(name) => {
                self.say(Style::Error, format!("Unknown command {}. Try /help.", name))
            }
        }
        true
    }

    async fn ask(&mut self, text: &str) {
        if !text.trim().is_empty() && !self.controller.is_loading() {
            self.say(Style::Hint, "Processing...");
        }
        let lines = match self.controller.submit(self.backend.as_ref(), text).await {
            Ok(reply) => render::message_lines(reply),
            Err(e) => {
                self.say(Style::Hint, e.to_string());
                return;
            }
        };
        self.painter.print(&lines);
        self.show_clarification();
    }

    fn show_clarification(&self) {
        if let Some(state) = self.controller.clarification() {
            self.painter.print(&render::clarification_lines(state));
        }
    }

    async fn upload(&mut self, paths: &[PathBuf]) {
        let painter = self.painter;
        let outcomes = self
            .uploader
            .upload_batch(self.backend.as_ref(), paths, |status| {
                painter.print(&[render::upload_line(status)]);
            })
            .await;
        let failed = outcomes.iter().filter(|o| o.status.is_failure()).count();
        tracing::info!(files = outcomes.len(), failed, "Upload batch finished");
    }

    fn show_tables(&self) {
        let tables = self.controller.tables();
        if tables.is_empty() {
            if self.pending_schemas.is_some() {
                self.say(Style::Hint, "Table schemas are still loading.");
            } else {
                self.say(Style::Hint, "No table schemas loaded.");
            }
            return;
        }
        for (name, schema) in tables {
            self.say(Style::Label, name.as_str());
            let text = match schema {
                serde_json::Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            };
            for line in text.lines() {
                self.say(Style::Detail, format!("  {}", line));
            }
        }
    }

    async fn logs(&mut self, action: LogsAction) {
        match action {
            LogsAction::Start => {
                if self.poller.as_ref().is_some_and(|p| p.is_running()) {
                    self.say(Style::Hint, "Log viewer already running.");
                    return;
                }
                self.poller = Some(LogPoller::spawn(
                    Arc::clone(&self.backend),
                    self.poll_interval,
                ));
                self.say(
                    Style::Hint,
                    format!(
                        "Polling logs every {}s. Use /logs show.",
                        self.poll_interval.as_secs()
                    ),
                );
            }
            LogsAction::Stop => {
                self.stop_logs().await;
                self.say(Style::Hint, "Log viewer stopped.");
            }
            LogsAction::Show => match &self.poller {
                Some(poller) => {
                    let text = poller.latest();
                    if text.is_empty() {
                        self.say(Style::Hint, "No logs yet.");
                    }
                    for line in text.lines() {
                        self.say(Style::Detail, line);
                    }
                }
                None => self.say(Style::Hint, "Log viewer is off. Use /logs start."),
            },
        }
    }

    async fn stop_logs(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel().await;
        }
    }

    fn toggle_theme(&mut self) {
        match self.theme.toggle() {
            Ok(theme) => {
                self.painter.set_theme(theme);
                self.say(Style::Hint, format!("Theme: {}", theme.as_str()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to persist theme");
                self.say(Style::Error, format!("Error: {}", e));
            }
        }
    }

    fn say(&self, style: Style, text: impl Into<String>) {
        self.painter.print(&[Line {
            style,
            text: text.into(),
        }]);
    }
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}
