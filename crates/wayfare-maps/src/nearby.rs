//! Nearest-place disambiguation flow.
//!
//! Geocodes the origin, then searches for the destination keyword around
//! the resulting coordinates. A geocode failure short-circuits the flow
//! without issuing the search call.

use tracing::warn;

use wayfare_core::NearbyPlace;

use crate::client::MapsProvider;

/// Find the nearest place matching `keyword` around the geocoded origin.
///
/// Any provider failure at either step resolves to `None`; the failure
/// is logged and the caller re-prompts the user. At most one geocode and
/// one search request are issued.
pub async fn find_nearest(
    provider: &dyn MapsProvider,
    origin: &str,
    keyword: &str,
) -> Option<NearbyPlace> {
    let coords = match provider.geocode(origin).await {
        Ok(c) => c,
        Err(e) => {
            warn!(origin, error = %e, "Geocode failed during nearby lookup");
            return None;
        }
    };

    match provider.nearby_search(coords, keyword).await {
        Ok(place) => place,
        Err(e) => {
            warn!(keyword, error = %e, "Nearby search failed");
            None
        }
    }
}
