//! Bounded in-memory conversation history.
//!
//! Keeps completed exchanges for the lifetime of the process so the
//! composer can be given conversational context. The log is bounded by a
//! configurable turn count; the oldest exchanges are evicted first.

use chrono::{DateTime, Local};
use uuid::Uuid;

/// One completed user/assistant exchange.
#[derive(Clone, Debug)]
pub struct Exchange {
    pub id: Uuid,
    /// The logical turn's text, including any augmentation fragments.
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Local>,
}

/// Append-only exchange log with a maximum size.
#[derive(Debug)]
pub struct ConversationLog {
    max_turns: usize,
    exchanges: Vec<Exchange>,
}

impl ConversationLog {
    /// Create an empty log bounded at `max_turns` exchanges.
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            exchanges: Vec::new(),
        }
    }

    /// Record a completed exchange, evicting the oldest if the log is
    /// full.
    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.exchanges.push(Exchange {
            id: Uuid::new_v4(),
            user: user.into(),
            assistant: assistant.into(),
            at: Local::now(),
        });
        while self.exchanges.len() > self.max_turns {
            self.exchanges.remove(0);
        }
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Render the most recent `turns` exchanges for the composer prompt.
    ///
    /// Returns an empty string when the log is empty.
    pub fn render_recent(&self, turns: usize) -> String {
        let skip = self.exchanges.len().saturating_sub(turns);
        self.exchanges[skip..]
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The full exchange list, oldest first.
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }
}
