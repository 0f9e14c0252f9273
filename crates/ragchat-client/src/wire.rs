//! Request and response bodies of the backend HTTP contract.

use std::collections::BTreeMap;

use ragchat_core::{Latency, SourceDocument};
use serde::{Deserialize, Serialize};

/// Table name to schema description, as returned by `GET /tables`.
pub type TableSchemas = BTreeMap<String, serde_json::Value>;

/// `POST /query` body.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
}

/// `POST /query` success body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// `RAG`, `NLQ` or `clarification_needed`; absent means RAG.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<SourceDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<Latency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Structured candidate columns for clarifications, when the backend
    /// provides them instead of (or as well as) listing them in `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl QueryResponse {
    /// A response carrying only a type and a result string.
    pub fn new(kind: &str, result: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.to_string()),
            result: Some(serde_json::Value::String(result.into())),
            ..Self::default()
        }
    }

    pub fn is_clarification(&self) -> bool {
        self.kind.as_deref() == Some("clarification_needed")
    }

    /// The result as display text. Non-string results are rendered as JSON.
    pub fn result_text(&self) -> String {
        match &self.result {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// `POST /upload` success body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub filename: String,
}

/// `GET /tables` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TablesResponse {
    #[serde(default)]
    pub tables: TableSchemas,
}

/// `GET /logs` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: String,
}

/// Failure body. `detail` is usually a string but validation errors may
/// send a list of objects instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// A document ready to be posted to `/upload`.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Build an upload, guessing the MIME type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_response_full_body() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "type": "NLQ",
            "result": "There were 42 orders.",
            "sql": "SELECT COUNT(*) FROM orders",
            "latency": {"total": 0.532, "llm": 0.4}
        }))
        .unwrap();
        assert_eq!(resp.kind.as_deref(), Some("NLQ"));
        assert_eq!(resp.result_text(), "There were 42 orders.");
        assert_eq!(resp.sql.as_deref(), Some("SELECT COUNT(*) FROM orders"));
        assert_eq!(resp.latency.unwrap().total, Some(0.532));
        assert!(resp.source_documents.is_none());
    }

    #[test]
    fn test_query_response_nulls_are_absent() {
        let resp: QueryResponse = serde_json::from_value(json!({
            "type": null,
            "result": null,
            "source_documents": null,
            "latency": null
        }))
        .unwrap();
        assert!(resp.kind.is_none());
        assert_eq!(resp.result_text(), "");
        assert!(resp.source_documents.is_none());
        assert!(resp.latency.is_none());
    }

    #[test]
    fn test_query_response_non_string_result() {
        let resp: QueryResponse =
            serde_json::from_value(json!({"type": "NLQ", "result": [1, 2]})).unwrap();
        assert_eq!(resp.result_text(), "[1,2]");
    }

    #[test]
    fn test_is_clarification() {
        assert!(QueryResponse::new("clarification_needed", "pick").is_clarification());
        assert!(!QueryResponse::new("RAG", "x").is_clarification());
        assert!(!QueryResponse::default().is_clarification());
    }

    #[test]
    fn test_query_request_body() {
        let body = serde_json::to_value(QueryRequest { query: "sales in Q3" }).unwrap();
        assert_eq!(body, json!({"query": "sales in Q3"}));
    }

    #[test]
    fn test_error_body_detail_shapes() {
        let s: ErrorBody = serde_json::from_value(json!({"detail": "bad file"})).unwrap();
        assert_eq!(s.detail_text().as_deref(), Some("bad file"));

        let list: ErrorBody =
            serde_json::from_value(json!({"detail": [{"msg": "field required"}]})).unwrap();
        assert_eq!(
            list.detail_text().as_deref(),
            Some(r#"[{"msg":"field required"}]"#)
        );

        let none: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert!(none.detail_text().is_none());
    }

    #[test]
    fn test_tables_response_missing_key_is_empty() {
        let resp: TablesResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.tables.is_empty());
    }

    #[test]
    fn test_upload_file_guesses_mime() {
        assert_eq!(UploadFile::new("a.pdf", vec![]).content_type, "application/pdf");
        assert_eq!(UploadFile::new("b.csv", vec![]).content_type, "text/csv");
        assert_eq!(
            UploadFile::new("c.unknownext", vec![]).content_type,
            "application/octet-stream"
        );
    }
}
