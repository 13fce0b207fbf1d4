use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// TravelMode
// =============================================================================

/// The four travel modes understood by the routing provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    Transit,
}

impl TravelMode {
    /// All modes in menu order.
    pub const ALL: [TravelMode; 4] = [
        TravelMode::Driving,
        TravelMode::Walking,
        TravelMode::Bicycling,
        TravelMode::Transit,
    ];

    /// The canonical lowercase token sent to the routing provider and
    /// appended to user input during augmentation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }

    /// Resolve a numbered menu choice (`"1"` through `"4"`).
    ///
    /// Returns `None` for anything else, including whitespace-padded or
    /// out-of-range entries; the caller re-prompts in that case.
    pub fn from_menu_choice(choice: &str) -> Option<TravelMode> {
        match choice.trim() {
            "1" => Some(TravelMode::Driving),
            "2" => Some(TravelMode::Walking),
            "3" => Some(TravelMode::Bicycling),
            "4" => Some(TravelMode::Transit),
            _ => None,
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(TravelMode::Driving),
            "walking" => Ok(TravelMode::Walking),
            "bicycling" => Ok(TravelMode::Bicycling),
            "transit" => Ok(TravelMode::Transit),
            other => Err(format!("unknown travel mode: {other}")),
        }
    }
}

// =============================================================================
// Coordinates
// =============================================================================

/// A latitude/longitude pair.
///
/// The `Display` form is the `"lat,lng"` string the mapping provider
/// expects in query parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

// =============================================================================
// NearbyPlace
// =============================================================================

/// A place returned by the nearby-search provider.
///
/// Turn-local: used only to build the disambiguation prompt and the
/// input augmentation, never stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,
    pub address: String,
    pub location: Coordinates,
}

// =============================================================================
// TravelInfo
// =============================================================================

/// The resolved travel query handed to the response composer.
///
/// `duration` and `eta` are both `Some` or both `None`; a routing
/// failure of any kind yields the `None` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelInfo {
    pub origin: String,
    pub destination: String,
    pub mode: TravelMode,
    pub duration: Option<String>,
    pub eta: Option<String>,
}

impl TravelInfo {
    /// Whether the routing provider produced a usable route.
    pub fn has_route(&self) -> bool {
        self.duration.is_some() && self.eta.is_some()
    }

    /// One-line summary interpolated into the composer prompt.
    pub fn summary(&self) -> String {
        format!(
            "Origin: {}, Destination: {}, Mode: {}, Duration: {}, ETA: {}",
            self.origin,
            self.destination,
            self.mode,
            self.duration.as_deref().unwrap_or("None"),
            self.eta.as_deref().unwrap_or("None"),
        )
    }
}
