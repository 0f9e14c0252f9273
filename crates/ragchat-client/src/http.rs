//! reqwest implementation of [`Backend`].

use std::time::Duration;

use async_trait::async_trait;
use ragchat_core::config::ApiConfig;
use serde::de::DeserializeOwned;

use crate::backend::Backend;
use crate::error::ApiError;
use crate::wire::{
    ErrorBody, LogsResponse, QueryRequest, QueryResponse, TableSchemas, TablesResponse,
    UploadFile, UploadResponse,
};

/// HTTP client for the RAG/NLQ service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check the status and decode the body.
    ///
    /// Non-2xx responses become `ApiError::Server` carrying the `detail`
    /// field when the body has one.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail_text());
            tracing::debug!(status = status.as_u16(), ?detail, "Backend returned error status");
            return Err(ApiError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{} - {}", e, body)))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn query(&self, query: &str) -> Result<QueryResponse, ApiError> {
        tracing::debug!(query_len = query.len(), "POST /query");
        let response = self
            .http
            .post(self.url("/query"))
            .json(&QueryRequest { query })
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        tracing::debug!(file = %file.file_name, bytes = file.bytes.len(), "POST /upload");
        let part = reqwest::multipart::Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn tables(&self) -> Result<TableSchemas, ApiError> {
        let response = self.http.get(self.url("/tables")).send().await?;
        let body: TablesResponse = Self::read_json(response).await?;
        Ok(body.tables)
    }

    async fn logs(&self) -> Result<String, ApiError> {
        let response = self.http.get(self.url("/logs")).send().await?;
        let body: LogsResponse = Self::read_json(response).await?;
        Ok(body.logs)
    }
}
