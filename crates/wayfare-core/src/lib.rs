//! Shared foundation for the Wayfare travel assistant.
//!
//! Holds the configuration model, the top-level error type, and the
//! domain types passed between the conversation, language-model, and
//! mapping crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Credentials, WayfareConfig};
pub use error::{Result, WayfareError};
pub use types::{Coordinates, NearbyPlace, TravelInfo, TravelMode};
