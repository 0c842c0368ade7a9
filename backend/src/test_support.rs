//! Deterministic stand-ins for the external collaborators.
//!
//! Every stub records its calls so tests can assert on how often, and with
//! what, the planner reached out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::models::{
    Coordinate, GeocodedPlace, NearbyQuery, PlaceEntry, RouteSummary, TravelMode, maps_url,
};
use crate::providers::{DirectionsProvider, Geocoder, PlaceSearch, TextGenerator};

/// A bare place with only identity, name and location filled in.
pub fn place(id: &str, name: &str, at: Coordinate) -> PlaceEntry {
    PlaceEntry {
        place_id: id.to_string(),
        name: name.to_string(),
        location: at,
        address: String::new(),
        rating: None,
        user_ratings_total: None,
        maps_url: maps_url(id),
        opening_hours: None,
        ai_details: None,
    }
}

fn record<T>(log: &Mutex<Vec<T>>, item: T) {
    if let Ok(mut entries) = log.lock() {
        entries.push(item);
    }
}

fn snapshot<T: Clone>(log: &Mutex<Vec<T>>) -> Vec<T> {
    log.lock().map(|entries| entries.clone()).unwrap_or_default()
}

/// Geocoder answering from a fixed table; unknown names are not found.
#[derive(Debug, Default)]
pub struct StubGeocoder {
    places: HashMap<String, GeocodedPlace>,
    failures: HashMap<String, ProviderError>,
    calls: Mutex<Vec<String>>,
}

impl StubGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_place(mut self, name: &str, at: Coordinate, formatted_address: &str) -> Self {
        self.places.insert(
            name.to_string(),
            GeocodedPlace {
                location: at,
                formatted_address: formatted_address.to_string(),
            },
        );
        self
    }

    pub fn failing_for(mut self, name: &str, error: ProviderError) -> Self {
        self.failures.insert(name.to_string(), error);
        self
    }

    /// Names looked up so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        snapshot(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, place: &str) -> Result<GeocodedPlace, ProviderError> {
        record(&self.calls, place.to_string());
        if let Some(error) = self.failures.get(place) {
            return Err(error.clone());
        }
        self.places
            .get(place)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("Geocoding failed for: {place}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteCall {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: TravelMode,
    pub via: Vec<Coordinate>,
}

/// Directions provider returning one canned answer, optionally after a delay.
#[derive(Debug)]
pub struct StubDirections {
    response: Result<RouteSummary, ProviderError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RouteCall>>,
}

impl StubDirections {
    pub fn with_route(summary: RouteSummary) -> Self {
        Self {
            response: Ok(summary),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_path(distance_km: f64, duration_minutes: f64, path: &[Coordinate]) -> Self {
        Self::with_route(RouteSummary {
            distance_km,
            duration_minutes,
            encoded_path: crate::polyline::encode(path),
            path: path.to_vec(),
        })
    }

    pub fn with_error(error: ProviderError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RouteCall> {
        snapshot(&self.calls)
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl DirectionsProvider for StubDirections {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        via: &[Coordinate],
    ) -> Result<RouteSummary, ProviderError> {
        record(
            &self.calls,
            RouteCall {
                origin,
                destination,
                mode,
                via: via.to_vec(),
            },
        );
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

/// Place search keyed by exact sample point and place type.
///
/// Points without configured results answer with an empty list.
#[derive(Debug, Default)]
pub struct StubPlaceSearch {
    results: Vec<(Coordinate, String, Vec<PlaceEntry>)>,
    failures: Vec<(Coordinate, ProviderError)>,
    queries: Mutex<Vec<NearbyQuery>>,
}

impl StubPlaceSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_places(mut self, at: Coordinate, place_type: &str, places: Vec<PlaceEntry>) -> Self {
        self.results.push((at, place_type.to_string(), places));
        self
    }

    /// Every search centred on `at` fails with `error`.
    pub fn failing_at(mut self, at: Coordinate, error: ProviderError) -> Self {
        self.failures.push((at, error));
        self
    }

    pub fn queries(&self) -> Vec<NearbyQuery> {
        snapshot(&self.queries)
    }

    pub fn call_count(&self) -> usize {
        self.queries().len()
    }
}

#[async_trait]
impl PlaceSearch for StubPlaceSearch {
    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<PlaceEntry>, ProviderError> {
        record(&self.queries, query.clone());
        if let Some((_, error)) = self.failures.iter().find(|(at, _)| *at == query.location) {
            return Err(error.clone());
        }
        Ok(self
            .results
            .iter()
            .filter(|(at, place_type, _)| *at == query.location && *place_type == query.place_type)
            .flat_map(|(_, _, places)| places.iter().cloned())
            .collect())
    }
}

/// Text generator answering every prompt with the same text, except for
/// places it is told to fail on.
#[derive(Debug)]
pub struct StubTextGenerator {
    reply: String,
    failing_names: Vec<String>,
    calls: AtomicUsize,
}

impl StubTextGenerator {
    pub fn always(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            failing_names: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail for prompts about any of `names`; answer `reply` otherwise.
    pub fn failing_for(names: &[&str], reply: &str) -> Self {
        Self {
            failing_names: names.iter().map(|name| format!("Name: {name}\n")).collect(),
            ..Self::always(reply)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_names.iter().any(|line| prompt.contains(line.as_str())) {
            return Err(ProviderError::Timeout {
                service: "text generation",
            });
        }
        Ok(self.reply.clone())
    }
}
