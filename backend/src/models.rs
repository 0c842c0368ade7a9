use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, Coordinate, FailureKind, PlaceEntry, RadiusInput, RouteInfo, TripPlanRequest,
    TripPlanResponse,
};

use crate::polyline;

const MAPS_PLACE_URL: &str = "https://www.google.com/maps/place/?q=place_id:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Bicycling,
    Walking,
}

impl TravelMode {
    /// Map a user-facing vehicle name onto a routing mode.
    ///
    /// Unknown names fall back to driving.
    pub fn from_vehicle(vehicle_type: &str) -> Self {
        match vehicle_type.trim().to_lowercase().as_str() {
            "bicycle" | "cycle" => Self::Bicycling,
            "walk" | "walking" => Self::Walking,
            _ => Self::Driving,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Bicycling => "bicycling",
            Self::Walking => "walking",
        }
    }
}

/// Result of a single directions lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub encoded_path: String,
    pub path: Vec<Coordinate>,
}

impl RouteSummary {
    /// Decode `encoded_path`, dropping points outside WGS84 degree ranges.
    pub fn from_encoded(distance_km: f64, duration_minutes: f64, encoded_path: String) -> Self {
        let decoded = polyline::decode(&encoded_path);
        let decoded_len = decoded.len();
        let path: Vec<Coordinate> = decoded.into_iter().filter(|point| point.is_valid()).collect();
        if path.len() < decoded_len {
            tracing::warn!(
                "dropped {} out-of-range points from route polyline",
                decoded_len - path.len()
            );
        }
        Self {
            distance_km,
            duration_minutes,
            encoded_path,
            path,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub location: Coordinate,
    pub formatted_address: String,
}

/// One nearby-search call centred on a sample point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub location: Coordinate,
    pub radius_meters: u32,
    pub place_type: String,
    pub keyword: Option<String>,
}

pub fn maps_url(place_id: &str) -> String {
    format!("{MAPS_PLACE_URL}{place_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_names_map_to_modes() {
        for name in ["car", "Cab", "taxi", "bike", "motorbike", "MOTORCYCLE"] {
            assert_eq!(TravelMode::from_vehicle(name), TravelMode::Driving, "{name}");
        }
        assert_eq!(TravelMode::from_vehicle("bicycle"), TravelMode::Bicycling);
        assert_eq!(TravelMode::from_vehicle("cycle"), TravelMode::Bicycling);
        assert_eq!(TravelMode::from_vehicle("walk"), TravelMode::Walking);
        assert_eq!(TravelMode::from_vehicle(" Walking "), TravelMode::Walking);
    }

    #[test]
    fn unknown_vehicle_defaults_to_driving() {
        assert_eq!(TravelMode::from_vehicle("hovercraft"), TravelMode::Driving);
        assert_eq!(TravelMode::from_vehicle(""), TravelMode::Driving);
    }

    #[test]
    fn route_summary_decodes_its_path() {
        let summary = RouteSummary::from_encoded(12.5, 30.0, "_p~iF~ps|U".to_string());
        assert_eq!(summary.path.len(), 1);
        assert!((summary.path[0].lat - 38.5).abs() < 1e-9);
        assert!((summary.path[0].lon + 120.2).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_points_are_dropped_from_path() {
        let encoded = polyline::encode(&[
            Coordinate::new(10.0, 10.0),
            Coordinate::new(95.0, 10.0),
            Coordinate::new(20.0, 200.0),
            Coordinate::new(20.0, 20.0),
        ]);

        let summary = RouteSummary::from_encoded(1.0, 1.0, encoded);

        assert_eq!(
            summary.path,
            vec![Coordinate::new(10.0, 10.0), Coordinate::new(20.0, 20.0)]
        );
    }

    #[test]
    fn maps_url_embeds_place_id() {
        assert_eq!(
            maps_url("ChIJ123"),
            "https://www.google.com/maps/place/?q=place_id:ChIJ123"
        );
    }
}
