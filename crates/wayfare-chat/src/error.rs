//! Error types for the conversational layer.

use wayfare_core::WayfareError;
use wayfare_llm::LlmError;

/// Errors from the query stages.
///
/// Every variant is recoverable at the conversation level: the
/// controller converts stage failures into re-prompts rather than
/// ending the session.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The model answered, but not with the structure the stage demands.
    #[error("{stage} stage returned a malformed completion: {detail}")]
    MalformedStage {
        stage: &'static str,
        detail: String,
    },

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl From<ChatError> for WayfareError {
    fn from(err: ChatError) -> Self {
        WayfareError::Chat(err.to_string())
    }
}
