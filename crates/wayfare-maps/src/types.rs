//! Wire types for the mapping provider's JSON responses.
//!
//! Only the fields Wayfare reads are modeled; everything else in the
//! provider payloads is ignored during deserialization.

use serde::Deserialize;

use wayfare_core::Coordinates;

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: Coordinates,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NearbySearchResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceResult {
    pub name: String,
    /// Short human-readable address; the provider calls this `vicinity`.
    #[serde(default)]
    pub vicinity: String,
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Route {
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Leg {
    pub duration: LegDuration,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegDuration {
    /// Human-readable duration, e.g. "3 hours 45 mins".
    pub text: String,
    /// Duration in seconds.
    pub value: i64,
}
