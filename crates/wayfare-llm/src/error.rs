//! Error types for the completion client.

use wayfare_core::WayfareError;

/// Errors from the language-model layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion response contained no choices")]
    NoChoices,

    #[error("completion was empty")]
    EmptyCompletion,
}

impl From<LlmError> for WayfareError {
    fn from(err: LlmError) -> Self {
        WayfareError::Llm(err.to_string())
    }
}
