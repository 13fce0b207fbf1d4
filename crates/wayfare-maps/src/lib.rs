//! Mapping provider clients for Wayfare.
//!
//! Wraps the geocoding, nearby-search, and directions endpoints behind
//! the [`MapsProvider`] trait, and builds the two flows the conversation
//! layer needs on top of it: nearest-place disambiguation and travel
//! duration with a computed ETA.

pub mod client;
pub mod duration;
pub mod error;
pub mod nearby;
mod types;

pub use client::{GoogleMapsClient, MapsProvider, RouteDuration};
pub use duration::{compute_eta, travel_duration};
pub use error::MapsError;
pub use nearby::find_nearest;
