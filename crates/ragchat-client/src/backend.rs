//! The backend contract as seen by the conversation layer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::wire::{QueryResponse, TableSchemas, UploadFile, UploadResponse};

/// Remote RAG/NLQ service.
///
/// `HttpBackend` is the production implementation; tests script their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /query`
    async fn query(&self, query: &str) -> Result<QueryResponse, ApiError>;

    /// `POST /upload`
    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError>;

    /// `GET /tables`
    async fn tables(&self) -> Result<TableSchemas, ApiError>;

    /// `GET /logs`
    async fn logs(&self) -> Result<String, ApiError>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn query(&self, query: &str) -> Result<QueryResponse, ApiError> {
        (**self).query(query).await
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        (**self).upload(file).await
    }

    async fn tables(&self) -> Result<TableSchemas, ApiError> {
        (**self).tables().await
    }

    async fn logs(&self) -> Result<String, ApiError> {
        (**self).logs().await
    }
}
