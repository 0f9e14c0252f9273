//! Terminal rendering of conversation messages.
//!
//! Layout is computed as plain styled lines first and colored last, so the
//! layout can be tested without ANSI codes.

use colored::{Color, Colorize};

use ragchat_chat::UploadStatus;
use ragchat_core::{ClarificationState, Message, MessageKind, Theme};

/// Semantic role of a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    User,
    Label,
    Body,
    Detail,
    Error,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub style: Style,
    pub text: String,
}

impl Line {
    fn new(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// Lines for one message.
pub fn message_lines(message: &Message) -> Vec<Line> {
    if message.is_user() {
        return vec![Line::new(Style::User, format!("You: {}", message.content))];
    }

    let mut lines = Vec::new();
    match message.kind {
        Some(MessageKind::Rag) => {
            lines.push(Line::new(Style::Label, "Type: RAG"));
            push_body(&mut lines, &message.content);
            if !message.source_documents.is_empty() {
                lines.push(Line::new(Style::Label, "Source Documents:"));
                for doc in &message.source_documents {
                    lines.push(Line::new(Style::Detail, format!("  - {}", doc.label())));
                }
            }
        }
        Some(MessageKind::Nlq) => {
            lines.push(Line::new(Style::Label, "Type: NLQ"));
            push_body(&mut lines, &message.content);
            if let Some(sql) = &message.sql {
                lines.push(Line::new(Style::Detail, format!("SQL: {}", sql)));
            }
            if let Some(total) = message.latency.total {
                lines.push(Line::new(Style::Detail, format!("Latency: {:.3}s", total)));
            }
        }
        Some(MessageKind::ClarificationNeeded) => {
            lines.push(Line::new(Style::Label, "Type: Clarification Needed"));
            push_body(&mut lines, &message.content);
        }
        Some(MessageKind::Plain) | None => {
            let style = if message.content.starts_with("Error: ") {
                Style::Error
            } else {
                Style::Body
            };
            for text in message.content.lines() {
                lines.push(Line::new(style, text));
            }
        }
    }
    lines
}

/// Column picker shown while a clarification is pending.
pub fn clarification_lines(state: &ClarificationState) -> Vec<Line> {
    let mut lines = Vec::new();
    if state.columns.is_empty() {
        lines.push(Line::new(
            Style::Hint,
            "No columns offered. Type /column <name> to pick one.",
        ));
        return lines;
    }
    lines.push(Line::new(Style::Label, "Select a column:"));
    for column in &state.columns {
        let marker = if *column == state.selected_column { "*" } else { " " };
        lines.push(Line::new(Style::Detail, format!(" {} {}", marker, column)));
    }
    lines.push(Line::new(
        Style::Hint,
        "Use /column <name>, then resend your question.",
    ));
    lines
}

/// One line per upload status change.
pub fn upload_line(status: &UploadStatus) -> Line {
    match status {
        UploadStatus::Uploading { file } => Line::new(Style::Hint, format!("{}: {}", file, status)),
        UploadStatus::Uploaded { .. } => Line::new(Style::Body, status.to_string()),
        UploadStatus::Failed { file, .. } => {
            Line::new(Style::Error, format!("{}: {}", file, status))
        }
    }
}

fn push_body(lines: &mut Vec<Line>, content: &str) {
    for text in content.lines() {
        lines.push(Line::new(Style::Body, text));
    }
}

/// Colors lines for the active theme.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    theme: Theme,
}

impl Painter {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    fn color(&self, style: Style) -> Color {
        match (self.theme, style) {
            (_, Style::Error) => Color::Red,
            (Theme::Light, Style::User) => Color::Blue,
            (Theme::Light, Style::Label) => Color::Black,
            (Theme::Light, Style::Body) => Color::Black,
            (Theme::Light, Style::Detail) => Color::BrightBlack,
            (Theme::Light, Style::Hint) => Color::Magenta,
            (Theme::Dark, Style::User) => Color::BrightCyan,
            (Theme::Dark, Style::Label) => Color::BrightWhite,
            (Theme::Dark, Style::Body) => Color::White,
            (Theme::Dark, Style::Detail) => Color::BrightBlack,
            (Theme::Dark, Style::Hint) => Color::BrightYellow,
        }
    }

    pub fn paint(&self, line: &Line) -> String {
        let colored = line.text.color(self.color(line.style));
        match line.style {
            Style::Label => colored.bold().to_string(),
            _ => colored.to_string(),
        }
    }

    pub fn print(&self, lines: &[Line]) {
        for line in lines {
            println!("{}", self.paint(line));
        }
    }
}
