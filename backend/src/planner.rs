//! Trip planning pipeline.
//!
//! A call walks through `Validating → Geocoding → Routing → Sampling →
//! Aggregating → Enriching → Done`. Only the first three stages can fail the
//! call; place searches and description generation absorb their own
//! failures so a routed trip always produces a result.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::aggregator::PlaceAggregator;
use crate::categories::{CategorySpec, CategoryTable};
use crate::enrichment::EnrichmentPipeline;
use crate::error::{ALLOWED_RADII_KM, PlannerError, ValidationError};
use crate::models::{
    GeocodedPlace, RadiusInput, RouteInfo, TravelMode, TripPlanRequest, TripPlanResponse,
};
use crate::providers::{DirectionsProvider, Geocoder, PlaceSearch, TextGenerator};
use crate::sampler;

pub const DEFAULT_RADIUS_KM: u32 = 10;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStage {
    Validating,
    Geocoding,
    Routing,
    Sampling,
    Aggregating,
    Enriching,
    Done,
    Failed,
}

impl PlanStage {
    /// Stages whose errors end the call.
    pub fn can_fail(self) -> bool {
        matches!(self, Self::Validating | Self::Geocoding | Self::Routing)
    }
}

impl fmt::Display for PlanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Geocoding => "geocoding",
            Self::Routing => "routing",
            Self::Sampling => "sampling",
            Self::Aggregating => "aggregating",
            Self::Enriching => "enriching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub sampling_step: NonZeroUsize,
    pub default_radius_km: u32,
    pub max_ai_places_per_category: usize,
    pub concurrency: NonZeroUsize,
    /// Whole-call deadline; `None` disables it.
    pub deadline: Option<Duration>,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            sampling_step: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
            default_radius_km: DEFAULT_RADIUS_KM,
            max_ai_places_per_category: 3,
            concurrency: NonZeroUsize::new(4).unwrap_or(NonZeroUsize::MIN),
            deadline: Some(Duration::from_secs(60)),
        }
    }
}

/// A request that passed validation, with its categories resolved.
#[derive(Debug, Clone)]
pub struct ValidatedTrip<'t> {
    pub origin: String,
    pub destination: String,
    pub via: Vec<String>,
    pub trip_date: NaiveDate,
    pub vehicle_type: String,
    pub mode: TravelMode,
    pub categories: Vec<(String, &'t CategorySpec)>,
    pub radius_km: u32,
}

impl ValidatedTrip<'_> {
    pub fn radius_meters(&self) -> u32 {
        self.radius_km * 1000
    }
}

pub struct TripPlanner {
    geocoder: Arc<dyn Geocoder>,
    directions: Arc<dyn DirectionsProvider>,
    places: Arc<dyn PlaceSearch>,
    text: Option<Arc<dyn TextGenerator>>,
    categories: Arc<CategoryTable>,
    settings: PlannerSettings,
}

impl TripPlanner {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        directions: Arc<dyn DirectionsProvider>,
        places: Arc<dyn PlaceSearch>,
        categories: Arc<CategoryTable>,
        settings: PlannerSettings,
    ) -> Self {
        Self {
            geocoder,
            directions,
            places,
            text: None,
            categories,
            settings,
        }
    }

    pub fn with_text_generator(mut self, text: Arc<dyn TextGenerator>) -> Self {
        self.text = Some(text);
        self
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.text.is_some()
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// Plan one trip.
    ///
    /// Validation happens before any provider is contacted. The deadline, if
    /// configured, covers everything after validation; on expiry in-flight
    /// calls are dropped.
    pub async fn plan_trip(&self, request: &TripPlanRequest) -> Result<TripPlanResponse, PlannerError> {
        tracing::debug!(stage = %PlanStage::Validating, "planning trip");
        let trip = self
            .validate(request)
            .map_err(|err| failed(PlanStage::Validating, err.into()))?;

        match self.settings.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.execute(&trip))
                .await
                .map_err(|_| {
                    tracing::warn!("trip planning exceeded its {deadline:?} deadline");
                    PlannerError::Timeout(deadline)
                })?,
            None => self.execute(&trip).await,
        }
    }

    pub fn validate(&self, request: &TripPlanRequest) -> Result<ValidatedTrip<'_>, ValidationError> {
        let mut missing = Vec::new();
        let origin = required(&request.from_place, "from_place", &mut missing);
        let destination = required(&request.to_place, "to_place", &mut missing);
        let trip_date = required(&request.trip_date, "trip_date", &mut missing);
        let vehicle_type = required(&request.vehicle_type, "vehicle_type", &mut missing);
        if request.preferences.is_none() {
            missing.push("preferences");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let trip_date = NaiveDate::parse_from_str(trip_date.trim(), DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate)?;

        let preferences = request.preferences.as_deref().unwrap_or_default();
        if preferences.is_empty() {
            return Err(ValidationError::NoPreferences);
        }
        let unknown: Vec<String> = preferences
            .iter()
            .filter(|label| !self.categories.contains(label))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::UnknownPreferences(unknown));
        }
        let mut categories: Vec<(String, &CategorySpec)> = Vec::with_capacity(preferences.len());
        for label in preferences {
            if categories.iter().any(|(known, _)| known == label) {
                continue;
            }
            categories.push((label.clone(), self.categories.resolve(label)?));
        }

        let radius_km = self.resolve_radius(request.places_radius_km.as_ref())?;

        Ok(ValidatedTrip {
            origin: origin.to_string(),
            destination: destination.to_string(),
            via: request.via_places.clone(),
            trip_date,
            vehicle_type: vehicle_type.to_string(),
            mode: TravelMode::from_vehicle(vehicle_type),
            categories,
            radius_km,
        })
    }

    fn resolve_radius(&self, input: Option<&RadiusInput>) -> Result<u32, ValidationError> {
        let radius = match input {
            None => i64::from(self.settings.default_radius_km),
            Some(RadiusInput::Integer(value)) => *value,
            Some(RadiusInput::Text(text)) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| ValidationError::RadiusNotInteger)?,
            Some(RadiusInput::Other(_)) => return Err(ValidationError::RadiusNotInteger),
        };
        ALLOWED_RADII_KM
            .iter()
            .copied()
            .find(|allowed| i64::from(*allowed) == radius)
            .ok_or(ValidationError::RadiusNotAllowed(radius))
    }

    async fn execute(&self, trip: &ValidatedTrip<'_>) -> Result<TripPlanResponse, PlannerError> {
        tracing::info!(
            "planning trip {} -> {} via {} stop(s), {} categories, {} km radius",
            trip.origin,
            trip.destination,
            trip.via.len(),
            trip.categories.len(),
            trip.radius_km
        );

        tracing::debug!(stage = %PlanStage::Geocoding, "entering stage");
        let origin = self.geocode(&trip.origin).await?;
        let destination = self.geocode(&trip.destination).await?;
        let mut via = Vec::with_capacity(trip.via.len());
        for name in &trip.via {
            via.push(self.geocode(name).await?.location);
        }

        tracing::debug!(stage = %PlanStage::Routing, mode = trip.mode.as_str(), "entering stage");
        let route = self
            .directions
            .route(origin.location, destination.location, trip.mode, &via)
            .await
            .map_err(|err| failed(PlanStage::Routing, err.into()))?;

        tracing::debug!(stage = %PlanStage::Sampling, points = route.path.len(), "entering stage");
        let samples = sampler::sample(&route.path, self.settings.sampling_step);

        tracing::debug!(stage = %PlanStage::Aggregating, samples = samples.len(), "entering stage");
        let specs: Vec<&CategorySpec> = trip.categories.iter().map(|(_, spec)| *spec).collect();
        let found = PlaceAggregator::new(self.places.as_ref(), self.settings.concurrency)
            .find_for_categories(&samples, &specs, trip.radius_meters())
            .await;
        let mut stops: BTreeMap<String, Vec<_>> = trip
            .categories
            .iter()
            .map(|(label, _)| label.clone())
            .zip(found)
            .collect();

        match &self.text {
            Some(text) => {
                tracing::debug!(stage = %PlanStage::Enriching, "entering stage");
                let pipeline = EnrichmentPipeline::new(text.as_ref(), self.settings.concurrency);
                for (label, places) in stops.iter_mut() {
                    let outcomes = pipeline
                        .enrich(places, label, self.settings.max_ai_places_per_category)
                        .await;
                    let annotated = outcomes.iter().filter(|o| o.is_annotated()).count();
                    tracing::debug!(category = %label, "{annotated}/{} places described", outcomes.len());
                }
            }
            None => tracing::debug!("enrichment disabled, skipping"),
        }

        tracing::debug!(stage = %PlanStage::Done, "entering stage");
        tracing::info!(
            "trip planned: {:.1} km, {} stops",
            route.distance_km,
            stops.values().map(Vec::len).sum::<usize>()
        );

        Ok(TripPlanResponse {
            route: RouteInfo {
                from: origin.formatted_address,
                to: destination.formatted_address,
                distance_km: round_to(route.distance_km, 2),
                duration_minutes: round_to(route.duration_minutes, 1),
                trip_date: trip.trip_date.format(DATE_FORMAT).to_string(),
                vehicle_type: trip.vehicle_type.clone(),
                via_places: trip.via.clone(),
                places_radius_km: trip.radius_km,
                ai_details_enabled: self.enrichment_enabled(),
            },
            stops,
        })
    }

    async fn geocode(&self, place: &str) -> Result<GeocodedPlace, PlannerError> {
        self.geocoder
            .geocode(place)
            .await
            .map_err(|err| failed(PlanStage::Geocoding, err.into()))
    }
}

/// Log the transition to `Failed` and hand the error back.
fn failed(stage: PlanStage, err: PlannerError) -> PlannerError {
    tracing::warn!(stage = %stage, next = %PlanStage::Failed, "trip planning failed: {err}");
    err
}

fn required<'r>(
    field: &'r Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> &'r str {
    match field.as_deref() {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(name);
            ""
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
