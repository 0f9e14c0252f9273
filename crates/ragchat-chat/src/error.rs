//! Error types for the conversation layer.

use ragchat_client::ApiError;
use ragchat_core::RagchatError;

/// Errors from the conversation controller and the upload flow.
///
/// Query failures are not surfaced here: the controller turns them into
/// assistant messages so the conversation stays usable.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a query is already in flight")]
    Busy,
    #[error("{0}")]
    Upload(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Core(#[from] RagchatError),
}

impl ChatError {
    /// Text shown to the user after `Error: `.
    pub fn detail_text(&self) -> String {
        match self {
            ChatError::Api(e) => e.detail_text(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(ChatError::Busy.to_string(), "a query is already in flight");
        assert_eq!(
            ChatError::Upload("unsupported file type: a.txt".into()).to_string(),
            "unsupported file type: a.txt"
        );
    }

    #[test]
    fn test_detail_text_prefers_server_detail() {
        let err = ChatError::from(ApiError::Server {
            status: 413,
            detail: Some("File too large".to_string()),
        });
        assert_eq!(err.detail_text(), "File too large");
        assert_eq!(err.to_string(), "Request failed with status code 413");
    }

    #[test]
    fn test_core_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf");
        let err = ChatError::from(RagchatError::from(io));
        assert!(matches!(err, ChatError::Core(_)));
        assert!(err.detail_text().contains("missing.pdf"));
    }
}
