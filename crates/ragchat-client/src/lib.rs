//! Client side of the RAG/NLQ backend contract.
//!
//! HTTP endpoints (query, upload, schemas, logs) behind the [`Backend`]
//! trait, and the Socket.IO realtime channel.

pub mod backend;
pub mod error;
pub mod http;
pub mod realtime;
pub mod wire;

pub use backend::Backend;
pub use error::ApiError;
pub use http::HttpBackend;
pub use realtime::{RealtimeChannel, RealtimeConfig, RealtimeConnection, RealtimeEvent};
pub use wire::{QueryResponse, TableSchemas, UploadFile, UploadResponse};
