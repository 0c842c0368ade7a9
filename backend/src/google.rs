//! Google Maps Platform clients: Geocoding, Directions and Places Nearby
//! Search, all over the JSON web service endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::ProviderError;
use crate::models::{
    Coordinate, GeocodedPlace, NearbyQuery, PlaceEntry, RouteSummary, TravelMode, maps_url,
};
use crate::providers::{
    ClientBuildError, DirectionsProvider, Geocoder, PlaceSearch, build_http_client,
    convert_reqwest_error,
};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const GEOCODING: &str = "geocoding";
const DIRECTIONS: &str = "directions";
const PLACES: &str = "places";

const STATUS_OK: &str = "OK";
const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";
const STATUS_NOT_FOUND: &str = "NOT_FOUND";

#[derive(Debug, Clone)]
pub struct GoogleMapsConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GoogleMapsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct GoogleMapsClient {
    client: Client,
    config: GoogleMapsConfig,
}

impl std::fmt::Debug for GoogleMapsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMapsClient")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl GoogleMapsClient {
    pub fn new(config: GoogleMapsConfig) -> Result<Self, ClientBuildError> {
        let client = build_http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: &'static str,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .query(params)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|err| convert_reqwest_error(service, err))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(service, err))?;

        response
            .json::<T>()
            .await
            .map_err(|err| convert_reqwest_error(service, err))
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, place: &str) -> Result<GeocodedPlace, ProviderError> {
        let params = [("address", place.to_string())];
        let response: GeocodeResponse = self.get_json(GEOCODING, "geocode/json", &params).await?;
        convert_geocode(place, response)
    }
}

#[async_trait]
impl DirectionsProvider for GoogleMapsClient {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
        via: &[Coordinate],
    ) -> Result<RouteSummary, ProviderError> {
        let params = directions_params(origin, destination, mode, via);
        let response: DirectionsResponse =
            self.get_json(DIRECTIONS, "directions/json", &params).await?;
        convert_directions(response)
    }
}

#[async_trait]
impl PlaceSearch for GoogleMapsClient {
    async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<PlaceEntry>, ProviderError> {
        let params = nearby_params(query);
        let response: NearbyResponse = self
            .get_json(PLACES, "place/nearbysearch/json", &params)
            .await?;
        convert_nearby(response)
    }
}

fn lat_lng(coord: Coordinate) -> String {
    format!("{},{}", coord.lat, coord.lon)
}

fn directions_params(
    origin: Coordinate,
    destination: Coordinate,
    mode: TravelMode,
    via: &[Coordinate],
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("origin", lat_lng(origin)),
        ("destination", lat_lng(destination)),
        ("mode", mode.as_str().to_string()),
    ];
    if !via.is_empty() {
        // `via:` marks pass-through waypoints that do not split the route into legs.
        let waypoints = via
            .iter()
            .map(|coord| format!("via:{}", lat_lng(*coord)))
            .collect::<Vec<_>>()
            .join("|");
        params.push(("waypoints", waypoints));
    }
    params
}

fn nearby_params(query: &NearbyQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("location", lat_lng(query.location)),
        ("radius", query.radius_meters.to_string()),
        ("type", query.place_type.clone()),
    ];
    if let Some(keyword) = &query.keyword {
        params.push(("keyword", keyword.clone()));
    }
    params
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(value: LatLng) -> Self {
        Coordinate::new(value.lat, value.lng)
    }
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    #[serde(default)]
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<RouteLeg>,
    overview_polyline: OverviewPolyline,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    distance: Measure,
    duration: Measure,
}

/// Distances in metres, durations in seconds.
#[derive(Debug, Deserialize)]
struct Measure {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<NearbyPlace>,
}

#[derive(Debug, Deserialize)]
struct NearbyPlace {
    #[serde(default)]
    place_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    vicinity: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_ratings_total: Option<u64>,
    #[serde(default)]
    opening_hours: Option<serde_json::Value>,
}

fn service_error(service: &'static str, status: String, message: Option<String>) -> ProviderError {
    ProviderError::Service {
        service,
        code: status,
        message: message.unwrap_or_default(),
    }
}

fn convert_geocode(query: &str, response: GeocodeResponse) -> Result<GeocodedPlace, ProviderError> {
    if response.status == STATUS_ZERO_RESULTS
        || (response.status == STATUS_OK && response.results.is_empty())
    {
        return Err(ProviderError::NotFound(format!("Geocoding failed for: {query}")));
    }
    if response.status != STATUS_OK {
        return Err(service_error(GEOCODING, response.status, response.error_message));
    }

    let first = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NotFound(format!("Geocoding failed for: {query}")))?;
    let location = Coordinate::from(first.geometry.location);
    if !location.is_valid() {
        return Err(ProviderError::Malformed {
            service: GEOCODING,
            message: format!("coordinate out of range for {query}"),
        });
    }

    Ok(GeocodedPlace {
        location,
        formatted_address: first
            .formatted_address
            .unwrap_or_else(|| query.to_string()),
    })
}

fn convert_directions(response: DirectionsResponse) -> Result<RouteSummary, ProviderError> {
    if response.status == STATUS_ZERO_RESULTS || response.status == STATUS_NOT_FOUND {
        return Err(ProviderError::NotFound(
            "No route found by Directions API".to_string(),
        ));
    }
    if response.status != STATUS_OK {
        return Err(service_error(DIRECTIONS, response.status, response.error_message));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NotFound("No route found by Directions API".to_string()))?;
    if route.legs.is_empty() {
        return Err(ProviderError::Malformed {
            service: DIRECTIONS,
            message: "route has no legs".to_string(),
        });
    }

    let metres: f64 = route.legs.iter().map(|leg| leg.distance.value).sum();
    let seconds: f64 = route.legs.iter().map(|leg| leg.duration.value).sum();
    Ok(RouteSummary::from_encoded(
        metres / 1000.0,
        seconds / 60.0,
        route.overview_polyline.points,
    ))
}

fn convert_nearby(response: NearbyResponse) -> Result<Vec<PlaceEntry>, ProviderError> {
    if response.status == STATUS_ZERO_RESULTS {
        return Ok(Vec::new());
    }
    if response.status != STATUS_OK {
        return Err(service_error(PLACES, response.status, response.error_message));
    }

    let places = response
        .results
        .into_iter()
        .filter_map(|place| {
            let place_id = place.place_id.filter(|id| !id.is_empty())?;
            let location = Coordinate::from(place.geometry?.location);
            Some(PlaceEntry {
                maps_url: maps_url(&place_id),
                name: place.name.unwrap_or_default(),
                location,
                address: place.vicinity.unwrap_or_default(),
                rating: place.rating,
                user_ratings_total: place.user_ratings_total,
                opening_hours: place.opening_hours,
                ai_details: None,
                place_id,
            })
        })
        .collect();

    Ok(places)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).expect("fixture should deserialize")
    }

    #[test]
    fn geocode_takes_first_result() {
        let response = parse(json!({
            "status": "OK",
            "results": [
                {"geometry": {"location": {"lat": 15.49, "lng": 73.82}}, "formatted_address": "Panaji, Goa, India"},
                {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}, "formatted_address": "elsewhere"}
            ]
        }));

        let place = convert_geocode("Panaji", response).unwrap();

        assert_eq!(place.location, Coordinate::new(15.49, 73.82));
        assert_eq!(place.formatted_address, "Panaji, Goa, India");
    }

    #[test]
    fn geocode_falls_back_to_query_text() {
        let response = parse(json!({
            "status": "OK",
            "results": [{"geometry": {"location": {"lat": 1.0, "lng": 2.0}}}]
        }));

        let place = convert_geocode("Somewhere", response).unwrap();

        assert_eq!(place.formatted_address, "Somewhere");
    }

    #[test]
    fn geocode_zero_results_is_not_found() {
        let response = parse(json!({"status": "ZERO_RESULTS", "results": []}));

        let err = convert_geocode("Atlantis", response).unwrap_err();

        assert_eq!(err, ProviderError::NotFound("Geocoding failed for: Atlantis".into()));
    }

    #[test]
    fn geocode_denied_is_service_error() {
        let response = parse(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }));

        let err = convert_geocode("Goa", response).unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "geocoding reported REQUEST_DENIED: The provided API key is invalid."
        );
    }

    #[test]
    fn directions_sums_legs_and_decodes_overview() {
        let response = parse(json!({
            "status": "OK",
            "routes": [{
                "legs": [
                    {"distance": {"value": 12000.0}, "duration": {"value": 900.0}},
                    {"distance": {"value": 3500.0}, "duration": {"value": 300.0}}
                ],
                "overview_polyline": {"points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"}
            }]
        }));

        let summary = convert_directions(response).unwrap();

        assert!((summary.distance_km - 15.5).abs() < 1e-9);
        assert!((summary.duration_minutes - 20.0).abs() < 1e-9);
        assert_eq!(summary.path.len(), 3);
    }

    #[test]
    fn directions_zero_results_is_not_found() {
        let response = parse(json!({"status": "ZERO_RESULTS", "routes": []}));

        assert!(convert_directions(response).unwrap_err().is_not_found());
    }

    #[test]
    fn directions_quota_is_service_error() {
        let response = parse(json!({"status": "OVER_QUERY_LIMIT"}));

        let err = convert_directions(response).unwrap_err();

        assert!(matches!(err, ProviderError::Service { ref code, .. } if code == "OVER_QUERY_LIMIT"));
    }

    #[test]
    fn nearby_skips_places_without_id_or_geometry() {
        let response = parse(json!({
            "status": "OK",
            "results": [
                {
                    "place_id": "beach-1",
                    "name": "Calangute Beach",
                    "geometry": {"location": {"lat": 15.54, "lng": 73.75}},
                    "vicinity": "Calangute",
                    "rating": 4.4,
                    "user_ratings_total": 1200,
                    "opening_hours": {"open_now": true}
                },
                {"name": "No id", "geometry": {"location": {"lat": 1.0, "lng": 1.0}}},
                {"place_id": "no-geometry", "name": "Ghost"}
            ]
        }));

        let places = convert_nearby(response).unwrap();

        assert_eq!(places.len(), 1);
        let beach = &places[0];
        assert_eq!(beach.place_id, "beach-1");
        assert_eq!(beach.address, "Calangute");
        assert_eq!(beach.rating, Some(4.4));
        assert_eq!(beach.user_ratings_total, Some(1200));
        assert_eq!(beach.opening_hours, Some(json!({"open_now": true})));
        assert_eq!(
            beach.maps_url,
            "https://www.google.com/maps/place/?q=place_id:beach-1"
        );
        assert!(beach.ai_details.is_none());
    }

    #[test]
    fn nearby_zero_results_is_empty() {
        let response = parse(json!({"status": "ZERO_RESULTS", "results": []}));

        assert!(convert_nearby(response).unwrap().is_empty());
    }

    #[test]
    fn directions_params_mark_via_points_in_order() {
        let params = directions_params(
            Coordinate::new(1.0, 2.0),
            Coordinate::new(3.0, 4.0),
            TravelMode::Walking,
            &[Coordinate::new(1.5, 2.5), Coordinate::new(2.5, 3.5)],
        );

        assert_eq!(
            params,
            vec![
                ("origin", "1,2".to_string()),
                ("destination", "3,4".to_string()),
                ("mode", "walking".to_string()),
                ("waypoints", "via:1.5,2.5|via:2.5,3.5".to_string()),
            ]
        );
    }

    #[test]
    fn directions_params_omit_empty_waypoints() {
        let params = directions_params(
            Coordinate::new(1.0, 2.0),
            Coordinate::new(3.0, 4.0),
            TravelMode::Driving,
            &[],
        );

        assert!(params.iter().all(|(name, _)| *name != "waypoints"));
    }

    #[test]
    fn nearby_params_include_keyword_only_when_present() {
        let mut query = NearbyQuery {
            location: Coordinate::new(15.5, 73.8),
            radius_meters: 10_000,
            place_type: "restaurant".to_string(),
            keyword: None,
        };
        assert_eq!(
            nearby_params(&query),
            vec![
                ("location", "15.5,73.8".to_string()),
                ("radius", "10000".to_string()),
                ("type", "restaurant".to_string()),
            ]
        );

        query.keyword = Some("veg vegetarian".to_string());
        assert_eq!(
            nearby_params(&query).last(),
            Some(&("keyword", "veg vegetarian".to_string()))
        );
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = GoogleMapsClient::new(
            GoogleMapsConfig::new("key").with_base_url("http://maps.example.com/api/"),
        )
        .expect("client should build");

        assert_eq!(
            client.endpoint("geocode/json"),
            "http://maps.example.com/api/geocode/json"
        );
    }
}
