use thiserror::Error;

/// Top-level error type for the Wayfare system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// WayfareError` so that the `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WayfareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Mapping provider error: {0}")]
    Maps(String),

    #[error("Conversation error: {0}")]
    Chat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for WayfareError {
    fn from(err: toml::de::Error) -> Self {
        WayfareError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WayfareError {
    fn from(err: toml::ser::Error) -> Self {
        WayfareError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WayfareError {
    fn from(err: serde_json::Error) -> Self {
        WayfareError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Wayfare operations.
pub type Result<T> = std::result::Result<T, WayfareError>;
