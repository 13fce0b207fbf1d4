//! Typed query stages backed by the completion client.
//!
//! Each stage renders its prompt, sends it through the
//! [`CompletionClient`], extracts the single JSON object the template
//! demands, and parses it strictly into the stage's result type. A
//! completion that does not carry the expected structure becomes a
//! [`ChatError::MalformedStage`], which the controller converts into a
//! rephrase prompt instead of ending the turn.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use wayfare_core::TravelMode;
use wayfare_llm::{extract_json_object, CompletionClient};

use crate::error::ChatError;
use crate::prompts;

// =============================================================================
// Stage result types
// =============================================================================

/// Result of the input-validation stage.
///
/// Consumed immediately by the controller; never persisted across turns.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    pub has_mode: bool,
}

/// Destination label produced by the classifier stage.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    General,
    Specific,
}

/// Result of the destination-classifier stage.
///
/// Branching uses the label only; confidence and reason are logged for
/// diagnostics.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DestinationClassification {
    pub classification: Classification,
    pub confidence: f32,
    #[serde(default)]
    pub reason: String,
}

/// Result of the location/mode-extractor stage.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ExtractedLocations {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
}

// =============================================================================
// QueryStages
// =============================================================================

/// The four prompt-driven stages, sharing one completion client.
pub struct QueryStages<C> {
    client: C,
}

impl<C: CompletionClient> QueryStages<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Run the validator stage on raw user text.
    pub async fn validate(&self, user_input: &str) -> Result<ValidationResult, ChatError> {
        let result: ValidationResult = self
            .run_json_stage("validator", prompts::validation_prompt(user_input))
            .await?;
        debug!(
            is_valid = result.is_valid,
            has_mode = result.has_mode,
            "Validation stage complete"
        );
        Ok(result)
    }

    /// Run the classifier stage on a destination string.
    ///
    /// Tolerates an empty destination; the model still returns a label.
    pub async fn classify(
        &self,
        destination: &str,
    ) -> Result<DestinationClassification, ChatError> {
        let result: DestinationClassification = self
            .run_json_stage("classifier", prompts::classification_prompt(destination))
            .await?;
        debug!(
            classification = ?result.classification,
            confidence = result.confidence,
            reason = %result.reason,
            "Classifier stage complete"
        );
        Ok(result)
    }

    /// Run the extractor stage on validated (possibly augmented) text.
    ///
    /// Enforces the extraction contract: origin and destination must be
    /// non-empty and the mode one of the four canonical tokens (the
    /// token set is enforced by `TravelMode`'s deserialization).
    pub async fn extract(&self, user_input: &str) -> Result<ExtractedLocations, ChatError> {
        let result: ExtractedLocations = self
            .run_json_stage("extractor", prompts::extraction_prompt(user_input))
            .await?;

        if result.origin.trim().is_empty() || result.destination.trim().is_empty() {
            return Err(ChatError::MalformedStage {
                stage: "extractor",
                detail: "origin and destination must be non-empty".to_string(),
            });
        }

        debug!(origin = %result.origin, destination = %result.destination, mode = %result.mode,
            "Extractor stage complete");
        Ok(result)
    }

    /// Run the composer stage over a travel-info summary and rendered
    /// conversation history. Returns prose, not JSON.
    pub async fn compose(&self, travel_info: &str, history: &str) -> Result<String, ChatError> {
        let prompt = prompts::composition_prompt(travel_info, history);
        Ok(self.client.complete(&prompt).await?)
    }

    async fn run_json_stage<T: DeserializeOwned>(
        &self,
        stage: &'static str,
        prompt: String,
    ) -> Result<T, ChatError> {
        let completion = self.client.complete(&prompt).await?;
        let object = extract_json_object(&completion).ok_or_else(|| ChatError::MalformedStage {
            stage,
            detail: "completion contained no JSON object".to_string(),
        })?;
        serde_json::from_str(&object).map_err(|e| ChatError::MalformedStage {
            stage,
            detail: e.to_string(),
        })
    }
}
