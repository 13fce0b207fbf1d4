//! Travel-duration lookup with a computed arrival time.

use chrono::{DateTime, Duration, Local};
use tracing::warn;

use wayfare_core::TravelMode;

use crate::client::MapsProvider;

/// Strftime pattern for arrival times, e.g. `2024/01/01 10:00 AM`.
const ETA_FORMAT: &str = "%Y/%m/%d %H:%M %p";

/// Format the arrival time for a route issued at `issued` taking
/// `seconds` to travel.
///
/// The ETA reflects the instant the query was issued, not when the
/// provider answered.
pub fn compute_eta(issued: DateTime<Local>, seconds: i64) -> String {
    (issued + Duration::seconds(seconds))
        .format(ETA_FORMAT)
        .to_string()
}

/// Look up the travel duration between two places.
///
/// Returns `(Some(duration_text), Some(eta))` on success and
/// `(None, None)` on any failure — transport error, provider rejection,
/// or no viable route. The cause is logged but deliberately not
/// distinguished in the result; the composer renders the same fixed
/// no-route sentence either way.
pub async fn travel_duration(
    provider: &dyn MapsProvider,
    origin: &str,
    destination: &str,
    mode: TravelMode,
) -> (Option<String>, Option<String>) {
    let issued = Local::now();
    match provider.route_duration(origin, destination, mode).await {
        Ok(route) => {
            let eta = compute_eta(issued, route.seconds);
            (Some(route.text), Some(eta))
        }
        Err(e) => {
            warn!(origin, destination, mode = %mode, error = %e, "Route lookup failed");
            (None, None)
        }
    }
}
