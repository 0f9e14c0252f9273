//! Conversation layer for the RAG/NLQ chat client.
//!
//! [`ConversationController`] turns user input into backend queries and
//! backend responses into an ordered message list, including the
//! clarification round trip. [`Uploader`] and [`LogPoller`] cover the
//! document upload and log viewer flows.

pub mod clarification;
pub mod controller;
pub mod error;
pub mod logs;
pub mod upload;

pub use clarification::parse_columns;
pub use controller::{load_table_schemas, ConversationController, PendingQuery};
pub use error::ChatError;
pub use logs::{LogPoller, LogPollerHandle};
pub use upload::{UploadOutcome, UploadStatus, Uploader};
