//! Conversational layer of the Wayfare travel assistant.
//!
//! Hosts the four prompt-driven query stages (validator, destination
//! classifier, location/mode extractor, response composer), the bounded
//! conversation history, and the controller state machine that sequences
//! stages, user re-prompts, and mapping lookups across turns.

pub mod controller;
pub mod error;
pub mod history;
pub mod prompts;
pub mod stages;

pub use controller::{Controller, ControllerState, Reply};
pub use error::ChatError;
pub use history::{ConversationLog, Exchange};
pub use stages::{
    Classification, DestinationClassification, ExtractedLocations, QueryStages, ValidationResult,
};
