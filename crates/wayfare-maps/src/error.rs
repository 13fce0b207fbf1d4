//! Error type for the mapping provider.
//!
//! Every failure at every call site is the same recoverable kind; the
//! conversation layer converts all of them into re-prompts. Nothing in
//! this crate can terminate the process.

use wayfare_core::WayfareError;

/// Errors from the geocoding/places/directions provider.
#[derive(Debug, thiserror::Error)]
pub enum MapsError {
    #[error("maps request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned provider status {status}")]
    ProviderStatus {
        endpoint: &'static str,
        status: String,
    },

    #[error("{endpoint} returned no results")]
    NoResults { endpoint: &'static str },
}

impl From<MapsError> for WayfareError {
    fn from(err: MapsError) -> Self {
        WayfareError::Maps(err.to_string())
    }
}
