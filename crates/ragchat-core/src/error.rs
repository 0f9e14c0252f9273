use thiserror::Error;

/// Top-level error type for ragchat.
///
/// Subsystem crates define their own error types and implement
/// `From<RagchatError>` so the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RagchatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Preference store error: {0}")]
    Prefs(String),
}

impl From<toml::de::Error> for RagchatError {
    fn from(err: toml::de::Error) -> Self {
        RagchatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RagchatError {
    fn from(err: toml::ser::Error) -> Self {
        RagchatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RagchatError {
    fn from(err: serde_json::Error) -> Self {
        RagchatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ragchat operations.
pub type Result<T> = std::result::Result<T, RagchatError>;
