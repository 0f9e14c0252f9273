use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Kind of an assistant message, as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Retrieval-augmented answer with source documents.
    #[serde(rename = "RAG")]
    Rag,
    /// Natural-language query answer with generated SQL and latency.
    #[serde(rename = "NLQ")]
    Nlq,
    /// Backend asks the user to pick a column before retrying.
    #[serde(rename = "clarification_needed")]
    ClarificationNeeded,
    /// Anything else, including locally generated error messages.
    #[serde(rename = "plain")]
    Plain,
}

impl MessageKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Rag => "RAG",
            MessageKind::Nlq => "NLQ",
            MessageKind::ClarificationNeeded => "clarification_needed",
            MessageKind::Plain => "plain",
        }
    }

    /// Map a backend `type` string to a kind. Unknown strings become `Plain`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "RAG" => MessageKind::Rag,
            "NLQ" => MessageKind::Nlq,
            "clarification_needed" => MessageKind::ClarificationNeeded,
            _ => MessageKind::Plain,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color theme of the terminal front end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Parse a stored value. Unknown values give `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

// =============================================================================
// Message payloads
// =============================================================================

/// A reference to a document that backed a RAG answer.
///
/// The backend sends either a bare filename or an object describing the
/// document; both are kept as received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceDocument {
    Name(String),
    Record(serde_json::Map<String, serde_json::Value>),
    Other(serde_json::Value),
}

impl SourceDocument {
    /// Human-readable label: filename, then id, then the raw JSON.
    pub fn label(&self) -> String {
        match self {
            SourceDocument::Name(name) => name.clone(),
            SourceDocument::Record(map) => ["filename", "id", "identifier"]
                .iter()
                .find_map(|key| map.get(*key).and_then(|v| v.as_str()))
                .map(str::to_string)
                .unwrap_or_else(|| serde_json::Value::Object(map.clone()).to_string()),
            SourceDocument::Other(value) => value.to_string(),
        }
    }
}

/// Timing breakdown attached to NLQ answers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Latency {
    /// End-to-end seconds, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Any other stages, passed through untouched.
    #[serde(flatten)]
    pub stages: BTreeMap<String, serde_json::Value>,
}

impl Latency {
    pub fn is_empty(&self) -> bool {
        self.total.is_none() && self.stages.is_empty()
    }
}

/// One conversational turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    /// Only set for assistant messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default)]
    pub source_documents: Vec<SourceDocument>,
    #[serde(default)]
    pub latency: Latency,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// A message typed by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            kind: None,
            content: content.into(),
            sql: None,
            source_documents: Vec::new(),
            latency: Latency::default(),
            created_at: Utc::now(),
        }
    }

    /// An assistant message with no attachments.
    pub fn assistant(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            kind: Some(kind),
            content: content.into(),
            sql: None,
            source_documents: Vec::new(),
            latency: Latency::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

// =============================================================================
// Clarification
// =============================================================================

/// A pending request from the backend to pick a column before retrying.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClarificationState {
    /// Prompt text as sent by the backend.
    pub message: String,
    /// Table the clarification concerns, if the backend named one.
    pub table: Option<String>,
    /// Candidate columns, in the order the backend listed them.
    pub columns: Vec<String>,
    /// Column chosen by the user; empty until one is picked.
    pub selected_column: String,
}

impl ClarificationState {
    pub fn has_selection(&self) -> bool {
        !self.selected_column.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_kind_from_wire() {
        assert_eq!(MessageKind::from_wire("RAG"), MessageKind::Rag);
        assert_eq!(MessageKind::from_wire("NLQ"), MessageKind::Nlq);
        assert_eq!(
            MessageKind::from_wire("clarification_needed"),
            MessageKind::ClarificationNeeded
        );
        assert_eq!(MessageKind::from_wire("rag"), MessageKind::Plain);
        assert_eq!(MessageKind::from_wire(""), MessageKind::Plain);
    }

    #[test]
    fn test_message_kind_serde_names() {
        let s = serde_json::to_string(&MessageKind::ClarificationNeeded).unwrap();
        assert_eq!(s, "\"clarification_needed\"");
        let k: MessageKind = serde_json::from_str("\"NLQ\"").unwrap();
        assert_eq!(k, MessageKind::Nlq);
    }

    #[test]
    fn test_theme_parse_and_toggle() {
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse(" light\n"), Some(Theme::Light));
        assert_eq!(Theme::parse("sepia"), None);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().as_str(), "light");
    }

    #[test]
    fn test_source_document_shapes() {
        let docs: Vec<SourceDocument> = serde_json::from_value(json!([
            "report.pdf",
            {"filename": "sales.csv", "page": 3},
            {"id": "doc-7"},
            {"page": 1},
            42
        ]))
        .unwrap();

        assert_eq!(docs.len(), 5);
        assert_eq!(docs[0].label(), "report.pdf");
        assert_eq!(docs[1].label(), "sales.csv");
        assert_eq!(docs[2].label(), "doc-7");
        assert_eq!(docs[3].label(), r#"{"page":1}"#);
        assert_eq!(docs[4].label(), "42");
    }

    #[test]
    fn test_latency_keeps_extra_stages() {
        let latency: Latency =
            serde_json::from_value(json!({"total": 1.25, "sql_generation": 0.8})).unwrap();
        assert_eq!(latency.total, Some(1.25));
        assert_eq!(latency.stages.get("sql_generation"), Some(&json!(0.8)));
        assert!(!latency.is_empty());
        assert!(Latency::default().is_empty());
    }

    #[test]
    fn test_message_constructors() {
        let user = Message::user("hello");
        assert!(user.is_user());
        assert!(user.kind.is_none());
        assert!(user.source_documents.is_empty());

        let bot = Message::assistant(MessageKind::Rag, "hi");
        assert_eq!(bot.role, Role::Assistant);
        assert_eq!(bot.kind, Some(MessageKind::Rag));
        assert_ne!(user.id, bot.id);
    }

    #[test]
    fn test_clarification_selection() {
        let mut state = ClarificationState::default();
        assert!(!state.has_selection());
        state.selected_column = "email".to_string();
        assert!(state.has_selection());
    }
}
