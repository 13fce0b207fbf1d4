//! HTTP client for the geocoding, nearby-search, and directions
//! endpoints, behind the [`MapsProvider`] trait.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use wayfare_core::config::MapsConfig;
use wayfare_core::{Coordinates, NearbyPlace, TravelMode};

use crate::error::MapsError;
use crate::types::{DirectionsResponse, GeocodeResponse, NearbySearchResponse};

/// A route's duration as reported by the directions endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteDuration {
    /// Human-readable duration text, e.g. "3 hours 45 mins".
    pub text: String,
    /// Duration in seconds, used to compute the ETA.
    pub seconds: i64,
}

/// Abstraction over the mapping provider.
///
/// The conversation layer depends on this trait so controller tests can
/// run against an in-memory provider.
#[async_trait]
pub trait MapsProvider: Send + Sync {
    /// Resolve a free-text address to coordinates.
    async fn geocode(&self, address: &str) -> Result<Coordinates, MapsError>;

    /// Find the nearest place matching `keyword` around `location`.
    ///
    /// `Ok(None)` means the provider answered but had no match within
    /// the search radius.
    async fn nearby_search(
        &self,
        location: Coordinates,
        keyword: &str,
    ) -> Result<Option<NearbyPlace>, MapsError>;

    /// Fetch the duration of the best route between two places.
    async fn route_duration(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<RouteDuration, MapsError>;
}

/// Client for the Google-style maps web service.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    nearby_radius_m: u32,
}

impl GoogleMapsClient {
    /// Build a client from the configured provider settings.
    pub fn new(config: &MapsConfig, api_key: &str) -> Result<Self, MapsError> {
        Self::with_base_url(config, api_key, config.base_url.clone())
    }

    /// Build a client pointed at an explicit base URL.
    ///
    /// Used by tests to target a local mock server.
    pub fn with_base_url(
        config: &MapsConfig,
        api_key: &str,
        base_url: String,
    ) -> Result<Self, MapsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            nearby_radius_m: config.nearby_radius_m,
        })
    }
}

#[async_trait]
impl MapsProvider for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<Coordinates, MapsError> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        debug!(address, "Geocoding");

        let response: GeocodeResponse = self
            .http
            .get(&url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(MapsError::ProviderStatus {
                endpoint: "geocode",
                status: response.status,
            });
        }

        response
            .results
            .into_iter()
            .next()
            .map(|r| r.geometry.location)
            .ok_or(MapsError::NoResults { endpoint: "geocode" })
    }

    async fn nearby_search(
        &self,
        location: Coordinates,
        keyword: &str,
    ) -> Result<Option<NearbyPlace>, MapsError> {
        let url = format!("{}/maps/api/place/nearbysearch/json", self.base_url);
        let radius = self.nearby_radius_m.to_string();
        let location = location.to_string();
        debug!(%location, keyword, radius = self.nearby_radius_m, "Nearby search");

        let response: NearbySearchResponse = self
            .http
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("keyword", keyword),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // ZERO_RESULTS is an answer, not a failure.
        if response.status != "OK" && response.status != "ZERO_RESULTS" {
            return Err(MapsError::ProviderStatus {
                endpoint: "nearby_search",
                status: response.status,
            });
        }

        // The provider ranks by prominence/distance; the first result is
        // taken as nearest.
        Ok(response.results.into_iter().next().map(|p| NearbyPlace {
            name: p.name,
            address: p.vicinity,
            location: p.geometry.location,
        }))
    }

    async fn route_duration(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<RouteDuration, MapsError> {
        let url = format!("{}/maps/api/directions/json", self.base_url);
        debug!(origin, destination, mode = %mode, "Fetching directions");

        let response: DirectionsResponse = self
            .http
            .get(&url)
            .query(&[
                ("origin", origin),
                ("destination", destination),
                ("mode", mode.as_str()),
                ("departure_time", "now"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.status != "OK" {
            return Err(MapsError::ProviderStatus {
                endpoint: "directions",
                status: response.status,
            });
        }

        response
            .routes
            .into_iter()
            .next()
            .and_then(|r| r.legs.into_iter().next())
            .map(|leg| RouteDuration {
                text: leg.duration.text,
                seconds: leg.duration.value,
            })
            .ok_or(MapsError::NoResults {
                endpoint: "directions",
            })
    }
}
