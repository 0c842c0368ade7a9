use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both components lie inside the WGS84 degree ranges.
    pub fn is_valid(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat.abs() <= 90.0 && self.lon.abs() <= 180.0
    }
}

/// Search radius as clients send it: a JSON integer or an integer string.
///
/// Anything else is kept verbatim so validation can report it instead of
/// failing the whole body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RadiusInput {
    Integer(i64),
    Text(String),
    Other(serde_json::Value),
}

/// Body of `POST /plan-trip`.
///
/// Required fields are optional here so the backend can list every missing
/// field in one validation error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Vec<String>>,
    #[serde(default)]
    pub via_places: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_radius_km: Option<RadiusInput>,
}

impl TripPlanRequest {
    pub fn new(
        from_place: impl Into<String>,
        to_place: impl Into<String>,
        trip_date: impl Into<String>,
        vehicle_type: impl Into<String>,
        preferences: Vec<String>,
    ) -> Self {
        Self {
            from_place: Some(from_place.into()),
            to_place: Some(to_place.into()),
            trip_date: Some(trip_date.into()),
            vehicle_type: Some(vehicle_type.into()),
            preferences: Some(preferences),
            via_places: Vec::new(),
            places_radius_km: None,
        }
    }

    pub fn with_via(mut self, via_places: Vec<String>) -> Self {
        self.via_places = via_places;
        self
    }

    pub fn with_radius_km(mut self, radius_km: i64) -> Self {
        self.places_radius_km = Some(RadiusInput::Integer(radius_km));
        self
    }
}

/// A place discovered near the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceEntry {
    pub place_id: String,
    pub name: String,
    #[serde(flatten)]
    pub location: Coordinate,
    pub address: String,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub maps_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub trip_date: String,
    pub vehicle_type: String,
    pub via_places: Vec<String>,
    pub places_radius_km: u32,
    pub ai_details_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlanResponse {
    pub route: RouteInfo,
    pub stops: BTreeMap<String, Vec<PlaceEntry>>,
}

/// Stable failure tag carried by every error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NotFound,
    ExternalService,
    Timeout,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: bool,
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_preferences: Option<Vec<String>>,
}

impl ApiError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            error: true,
            kind,
            message: message.into(),
            allowed_preferences: None,
        }
    }
}
