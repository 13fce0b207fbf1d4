//! Language-model completion client for Wayfare.
//!
//! Provides the [`CompletionClient`] trait the conversation layer is
//! written against, an HTTP implementation speaking the OpenAI-style
//! chat-completions protocol, and the JSON extraction helper used to
//! pull structured objects out of free-form completions.

pub mod client;
pub mod error;
pub mod json;

pub use client::{CompletionClient, HttpCompletionClient};
pub use error::LlmError;
pub use json::extract_json_object;
