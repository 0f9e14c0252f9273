//! In-memory backend with scripted responses.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use ragchat_client::{ApiError, Backend, QueryResponse, TableSchemas, UploadFile, UploadResponse};

#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<QueryResponse, ApiError>>>,
    queries: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
    failing_uploads: Vec<String>,
    tables: Option<TableSchemas>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, response: Result<QueryResponse, ApiError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn respond_json(self, body: serde_json::Value) -> Self {
        let parsed: QueryResponse = serde_json::from_value(body).unwrap();
        self.respond(Ok(parsed))
    }

    pub fn fail_upload(mut self, file_name: &str) -> Self {
        self.failing_uploads.push(file_name.to_string());
        self
    }

    pub fn with_tables(mut self, tables: TableSchemas) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn query(&self, query: &str) -> Result<QueryResponse, ApiError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("no scripted response".to_string())))
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        self.uploads.lock().unwrap().push(file.file_name.clone());
        if self.failing_uploads.contains(&file.file_name) {
            return Err(ApiError::Server {
                status: 400,
                detail: Some("Unsupported file".to_string()),
            });
        }
        Ok(UploadResponse {
            filename: file.file_name,
        })
    }

    async fn tables(&self) -> Result<TableSchemas, ApiError> {
        self.tables.clone().ok_or(ApiError::Server {
            status: 503,
            detail: None,
        })
    }

    async fn logs(&self) -> Result<String, ApiError> {
        Ok(String::new())
    }
}
