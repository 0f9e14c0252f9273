//! Conversation controller: owns the message list, the loading flag and the
//! pending clarification, and reduces backend responses into messages.
//!
//! A submission is split in two halves so the in-flight window is explicit:
//! [`ConversationController::begin_submit`] appends the user message and
//! marks the controller loading, [`ConversationController::complete`] reduces
//! the outcome and always clears loading. [`ConversationController::submit`]
//! runs both around a backend call.

use ragchat_client::{ApiError, Backend, QueryResponse, TableSchemas};
use ragchat_core::{ClarificationState, Message, MessageKind};
use uuid::Uuid;

use crate::clarification;
use crate::error::ChatError;

/// A submission whose query has not resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    /// Id of the user message appended for this submission.
    pub user_message_id: Uuid,
    /// Text to send to `/query`.
    pub effective_query: String,
}

/// Client-side conversation state machine.
#[derive(Debug, Default)]
pub struct ConversationController {
    messages: Vec<Message>,
    loading: bool,
    clarification: Option<ClarificationState>,
    tables: TableSchemas,
}

impl ConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn clarification(&self) -> Option<&ClarificationState> {
        self.clarification.as_ref()
    }

    /// Column picked for the pending clarification; empty when none.
    pub fn selected_column(&self) -> &str {
        self.clarification
            .as_ref()
            .map(|c| c.selected_column.as_str())
            .unwrap_or("")
    }

    pub fn tables(&self) -> &TableSchemas {
        &self.tables
    }

    // -----------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------

    /// Validate input, append the user message and enter the loading state.
    ///
    /// Whitespace-only input and submissions while a query is in flight are
    /// rejected without touching any state.
    pub fn begin_submit(&mut self, input: &str) -> Result<PendingQuery, ChatError> {
        if input.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.loading {
            return Err(ChatError::Busy);
        }

        let user = Message::user(input);
        let user_message_id = user.id;
        self.messages.push(user);
        self.loading = true;

        let effective_query = self.effective_query(input);
        tracing::debug!(%user_message_id, query = %effective_query, "Query submitted");

        Ok(PendingQuery {
            user_message_id,
            effective_query,
        })
    }

    /// Reduce the outcome of a pending query into exactly one assistant
    /// message and leave the loading state.
    pub fn complete(
        &mut self,
        pending: PendingQuery,
        outcome: Result<QueryResponse, ApiError>,
    ) -> &Message {
        let message = match outcome {
            Ok(response) if response.is_clarification() => self.enter_clarification(response),
            Ok(response) => {
                self.clarification = None;
                answer_message(response)
            }
            Err(err) => {
                tracing::warn!(
                    user_message_id = %pending.user_message_id,
                    error = %err,
                    "Query failed"
                );
                Message::assistant(MessageKind::Plain, format!("Error: {}", err.detail_text()))
            }
        };

        let index = self.messages.len();
        self.messages.push(message);
        self.loading = false;
        &self.messages[index]
    }

    /// Submit `input` to `backend` and return the assistant reply.
    ///
    /// If the returned future is dropped before the backend answers, the
    /// reply is lost and the controller leaves the loading state.
    pub async fn submit<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        input: &str,
    ) -> Result<&Message, ChatError> {
        let pending = self.begin_submit(input)?;
        let in_flight = InFlight { controller: &mut *self };
        let outcome = backend.query(&pending.effective_query).await;
        let index = in_flight.controller.messages.len();
        in_flight.controller.complete(pending, outcome);
        drop(in_flight);
        Ok(&self.messages[index])
    }

    // -----------------------------------------------------------------
    // Clarification
    // -----------------------------------------------------------------

    /// Pick the column for the pending clarification. Takes effect on the
    /// next submission. Returns `false` when nothing is pending.
    pub fn select_clarification_column(&mut self, column: &str) -> bool {
        match self.clarification.as_mut() {
            Some(state) => {
                state.selected_column = column.trim().to_string();
                tracing::debug!(column = %state.selected_column, "Clarification column selected");
                true
            }
            None => {
                tracing::debug!(column, "No pending clarification; column ignored");
                false
            }
        }
    }

    fn effective_query(&self, input: &str) -> String {
        match &self.clarification {
            Some(state) if state.has_selection() => {
                format!("{} (search in column: {})", input, state.selected_column)
            }
            _ => input.to_string(),
        }
    }

    fn enter_clarification(&mut self, response: QueryResponse) -> Message {
        let text = response.result_text();
        let columns = clarification::columns_for(&response);
        tracing::info!(
            table = ?response.table,
            columns = columns.len(),
            "Backend requested clarification"
        );
        self.clarification = Some(ClarificationState {
            message: text.clone(),
            table: response.table,
            columns,
            selected_column: String::new(),
        });
        Message::assistant(MessageKind::ClarificationNeeded, text)
    }

    // -----------------------------------------------------------------
    // Schemas
    // -----------------------------------------------------------------

    /// Load the table schema map. Failures are logged and leave the map as
    /// it was.
    pub async fn fetch_table_schemas<B: Backend + ?Sized>(&mut self, backend: &B) -> &TableSchemas {
        if let Some(tables) = load_table_schemas(backend).await {
            self.tables = tables;
        }
        &self.tables
    }

    /// Store a schema map fetched elsewhere, e.g. by a background task.
    pub fn set_table_schemas(&mut self, tables: TableSchemas) {
        self.tables = tables;
    }
}

/// Fetch the table schema map. Failures are logged and give `None`.
pub async fn load_table_schemas<B: Backend + ?Sized>(backend: &B) -> Option<TableSchemas> {
    match backend.tables().await {
        Ok(tables) => {
            tracing::info!(tables = tables.len(), "Table schemas loaded");
            Some(tables)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Error fetching table schemas");
            None
        }
    }
}

/// Clears the loading flag when a `submit` future ends, including when it
/// is dropped mid-query.
struct InFlight<'a> {
    controller: &'a mut ConversationController,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.controller.loading {
            tracing::debug!("Submission dropped before the backend answered");
            self.controller.loading = false;
        }
    }
}

/// Build the assistant message for a RAG/NLQ (or untyped) response.
fn answer_message(response: QueryResponse) -> Message {
    let kind = response
        .kind
        .as_deref()
        .map(MessageKind::from_wire)
        .unwrap_or(MessageKind::Rag);
    let text = response.result_text();
    let mut message = Message::assistant(kind, strip_wrapping_quotes(&text).trim());
    message.sql = response.sql;
    message.source_documents = response.source_documents.unwrap_or_default();
    message.latency = response.latency.unwrap_or_default();
    message
}

/// Remove one leading and one trailing `"` when both are present.
fn strip_wrapping_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::Role;

    fn pending(ctl: &mut ConversationController, input: &str) -> PendingQuery {
        ctl.begin_submit(input).unwrap()
    }

    // ---- Quote stripping ----

    #[test]
    fn test_strip_wrapping_quotes() {
        assert_eq!(strip_wrapping_quotes("\"Hello\""), "Hello");
        assert_eq!(strip_wrapping_quotes("\"only leading"), "\"only leading");
        assert_eq!(strip_wrapping_quotes("only trailing\""), "only trailing\"");
        assert_eq!(strip_wrapping_quotes("\"\"x\"\""), "\"x\"");
        assert_eq!(strip_wrapping_quotes("\""), "\"");
        assert_eq!(strip_wrapping_quotes("\"\""), "");
        assert_eq!(strip_wrapping_quotes("plain"), "plain");
    }

    // ---- begin_submit ----

    #[test]
    fn test_begin_submit_rejects_whitespace() {
        let mut ctl = ConversationController::new();
        assert!(matches!(ctl.begin_submit("   \n\t"), Err(ChatError::EmptyMessage)));
        assert!(matches!(ctl.begin_submit(""), Err(ChatError::EmptyMessage)));
        assert!(ctl.messages().is_empty());
        assert!(!ctl.is_loading());
    }

    #[test]
    fn test_begin_submit_appends_user_message_and_loads() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "  sales in Q3 ");
        assert!(ctl.is_loading());
        assert_eq!(ctl.messages().len(), 1);
        assert_eq!(ctl.messages()[0].role, Role::User);
        assert_eq!(ctl.messages()[0].content, "  sales in Q3 ");
        assert_eq!(ctl.messages()[0].id, p.user_message_id);
        assert_eq!(p.effective_query, "  sales in Q3 ");
    }

    #[test]
    fn test_begin_submit_while_loading_is_busy() {
        let mut ctl = ConversationController::new();
        let _p = pending(&mut ctl, "first");
        assert!(matches!(ctl.begin_submit("second"), Err(ChatError::Busy)));
        assert_eq!(ctl.messages().len(), 1);
        assert!(ctl.is_loading());
    }

    // ---- complete ----

    #[test]
    fn test_complete_rag_strips_quotes() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "hi");
        let resp: QueryResponse = serde_json::from_value(serde_json::json!({
            "type": "RAG",
            "result": "\"Hello\"",
            "source_documents": []
        }))
        .unwrap();
        let msg = ctl.complete(p, Ok(resp));
        assert_eq!(msg.content, "Hello");
        assert_eq!(msg.kind, Some(MessageKind::Rag));
        assert!(msg.source_documents.is_empty());
        assert!(!ctl.is_loading());
    }

    #[test]
    fn test_complete_trims_after_stripping() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "hi");
        let msg = ctl.complete(p, Ok(QueryResponse::new("RAG", "\"  padded \n\"")));
        assert_eq!(msg.content, "padded");
    }

    #[test]
    fn test_complete_missing_type_defaults_to_rag() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "hi");
        let resp = QueryResponse {
            result: Some(serde_json::json!("answer")),
            ..QueryResponse::default()
        };
        let msg = ctl.complete(p, Ok(resp));
        assert_eq!(msg.kind, Some(MessageKind::Rag));
        assert_eq!(msg.content, "answer");
    }

    #[test]
    fn test_complete_nlq_carries_sql_and_latency() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "how many orders");
        let resp: QueryResponse = serde_json::from_value(serde_json::json!({
            "type": "NLQ",
            "result": "42",
            "sql": "SELECT COUNT(*) FROM orders",
            "latency": {"total": 1.5}
        }))
        .unwrap();
        let msg = ctl.complete(p, Ok(resp));
        assert_eq!(msg.kind, Some(MessageKind::Nlq));
        assert_eq!(msg.sql.as_deref(), Some("SELECT COUNT(*) FROM orders"));
        assert_eq!(msg.latency.total, Some(1.5));
    }

    #[test]
    fn test_complete_error_uses_detail() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "hi");
        let err = ApiError::Server {
            status: 400,
            detail: Some("Invalid query".to_string()),
        };
        let msg = ctl.complete(p, Err(err));
        assert_eq!(msg.content, "Error: Invalid query");
        assert_eq!(msg.role, Role::Assistant);
        assert!(!ctl.is_loading());
    }

    #[test]
    fn test_complete_transport_error_uses_raw_text() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "hi");
        let msg = ctl.complete(p, Err(ApiError::Transport("Network Error".to_string())));
        assert_eq!(msg.content, "Error: Network Error");
    }

    #[test]
    fn test_complete_clarification_sets_state() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "find bob");
        let mut resp =
            QueryResponse::new("clarification_needed", "Please choose a column: ['name', 'email']");
        resp.table = Some("users".to_string());
        let msg = ctl.complete(p, Ok(resp));
        assert_eq!(msg.kind, Some(MessageKind::ClarificationNeeded));
        assert_eq!(msg.content, "Please choose a column: ['name', 'email']");

        let state = ctl.clarification().unwrap();
        assert_eq!(state.columns, vec!["name", "email"]);
        assert_eq!(state.table.as_deref(), Some("users"));
        assert_eq!(ctl.selected_column(), "");
    }

    #[test]
    fn test_error_keeps_pending_clarification() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "find bob");
        ctl.complete(p, Ok(QueryResponse::new("clarification_needed", "['a']")));
        ctl.select_clarification_column("a");

        let p = pending(&mut ctl, "again");
        ctl.complete(p, Err(ApiError::Transport("timeout".to_string())));
        assert!(ctl.clarification().is_some());
        assert_eq!(ctl.selected_column(), "a");
    }

    #[test]
    fn test_new_clarification_overwrites_previous() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "q1");
        ctl.complete(p, Ok(QueryResponse::new("clarification_needed", "['a', 'b']")));
        ctl.select_clarification_column("a");

        let p = pending(&mut ctl, "q2");
        ctl.complete(p, Ok(QueryResponse::new("clarification_needed", "['c']")));
        let state = ctl.clarification().unwrap();
        assert_eq!(state.columns, vec!["c"]);
        assert_eq!(ctl.selected_column(), "");
    }

    // ---- select_clarification_column ----

    #[test]
    fn test_select_without_clarification_is_ignored() {
        let mut ctl = ConversationController::new();
        assert!(!ctl.select_clarification_column("email"));
        assert_eq!(ctl.selected_column(), "");
        let p = pending(&mut ctl, "find it");
        assert_eq!(p.effective_query, "find it");
    }

    #[test]
    fn test_effective_query_with_selection() {
        let mut ctl = ConversationController::new();
        let p = pending(&mut ctl, "find bob");
        ctl.complete(p, Ok(QueryResponse::new("clarification_needed", "['name', 'email']")));

        // Pending clarification without a selection sends the raw text.
        let p = pending(&mut ctl, "find bob");
        assert_eq!(p.effective_query, "find bob");
        ctl.complete(p, Ok(QueryResponse::new("clarification_needed", "['name', 'email']")));

        assert!(ctl.select_clarification_column("email"));
        let p = pending(&mut ctl, "find it");
        assert_eq!(p.effective_query, "find it (search in column: email)");
    }
}
