//! Contracts for the external services the planner consumes.
//!
//! The planner only sees these traits; [`crate::google`] and
//! [`crate::openai`] provide the HTTP implementations and
//! [`crate::test_support`] the call-counting stubs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::ProviderError;
use crate::models::{Coordinate, GeocodedPlace, NearbyQuery, PlaceEntry, RouteSummary, TravelMode};

pub const DEFAULT_USER_AGENT: &str = "roadtrip-planner/0.1";

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-form place name.
    ///
    /// Returns [`ProviderError::NotFound`] when the service answers but has
    /// no match.
    async fn geocode(&self, place: &str) -> Result<GeocodedPlace, ProviderError>;
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Route from `origin` to `destination` passing near each `via` point in
    /// order, without stopping there.
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        via: &[Coordinate],
    ) -> Result<RouteSummary, ProviderError>;
}

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<PlaceEntry>, ProviderError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[from] reqwest::Error);

pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, ClientBuildError> {
    let client = Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Convert a reqwest error without leaking the request URL, which carries
/// the API key.
pub(crate) fn convert_reqwest_error(service: &'static str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        return ProviderError::Timeout { service };
    }
    if let Some(status) = error.status() {
        return ProviderError::Status {
            service,
            status: status.as_u16(),
        };
    }
    if error.is_decode() {
        return ProviderError::Malformed {
            service,
            message: error.without_url().to_string(),
        };
    }
    ProviderError::Transport {
        service,
        message: error.without_url().to_string(),
    }
}
