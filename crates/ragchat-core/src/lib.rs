pub mod config;
pub mod error;
pub mod prefs;
pub mod types;

pub use config::RagchatConfig;
pub use error::{RagchatError, Result};
pub use prefs::{FileStore, KeyValueStore, MemoryStore, ThemeStore};
pub use types::*;
