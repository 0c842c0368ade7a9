//! Process configuration read once from the environment at startup.

use std::env;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::categories::CategoryTable;
use crate::error::ALLOWED_RADII_KM;
use crate::google::{GoogleMapsClient, GoogleMapsConfig};
use crate::openai::{DEFAULT_MODEL, OpenAiClient, OpenAiConfig};
use crate::planner::{DEFAULT_RADIUS_KM, PlannerSettings, TripPlanner};
use crate::providers::ClientBuildError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error(transparent)]
    Client(#[from] ClientBuildError),
}

#[derive(Clone)]
pub struct AppConfig {
    pub google_api_key: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub default_radius_km: u32,
    pub sampling_step: NonZeroUsize,
    pub request_timeout: Duration,
    pub max_ai_places_per_category: usize,
    pub search_concurrency: NonZeroUsize,
    pub plan_deadline: Option<Duration>,
    pub bind_addr: SocketAddr,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("openai_enabled", &self.openai_api_key.is_some())
            .field("openai_model", &self.openai_model)
            .field("default_radius_km", &self.default_radius_km)
            .field("sampling_step", &self.sampling_step)
            .field("request_timeout", &self.request_timeout)
            .field("max_ai_places_per_category", &self.max_ai_places_per_category)
            .field("search_concurrency", &self.search_concurrency)
            .field("plan_deadline", &self.plan_deadline)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let google_api_key = get("GOOGLE_MAPS_API_KEY").ok_or(ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?;

        let default_radius_km = parse_or(&get, "DEFAULT_PLACES_RADIUS_KM", DEFAULT_RADIUS_KM)?;
        if !ALLOWED_RADII_KM.contains(&default_radius_km) {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_PLACES_RADIUS_KM",
                value: default_radius_km.to_string(),
            });
        }

        let plan_deadline_secs: u64 = parse_or(&get, "PLAN_DEADLINE_SECONDS", 60)?;

        Ok(Self {
            google_api_key,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            default_radius_km,
            sampling_step: parse_or(&get, "ROUTE_SAMPLING_STEP", nonzero(10))?,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECONDS", 10)?),
            max_ai_places_per_category: parse_or(&get, "MAX_AI_PLACES_PER_CATEGORY", 3)?,
            search_concurrency: parse_or(&get, "SEARCH_CONCURRENCY", nonzero(4))?,
            // 0 disables the deadline
            plan_deadline: (plan_deadline_secs > 0).then(|| Duration::from_secs(plan_deadline_secs)),
            bind_addr: parse_or(&get, "BIND_ADDR", parse_default_addr())?,
        })
    }

    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            sampling_step: self.sampling_step,
            default_radius_km: self.default_radius_km,
            max_ai_places_per_category: self.max_ai_places_per_category,
            concurrency: self.search_concurrency,
            deadline: self.plan_deadline,
        }
    }

    /// Wire the production clients into a planner.
    ///
    /// Description generation is only attached when an OpenAI key is set.
    pub fn build_planner(&self) -> Result<TripPlanner, ConfigError> {
        let maps = Arc::new(GoogleMapsClient::new(
            GoogleMapsConfig::new(self.google_api_key.clone()).with_timeout(self.request_timeout),
        )?);
        let planner = TripPlanner::new(
            maps.clone(),
            maps.clone(),
            maps,
            Arc::new(CategoryTable::builtin()),
            self.planner_settings(),
        );

        match &self.openai_api_key {
            Some(key) => {
                let openai = OpenAiClient::new(
                    OpenAiConfig::new(key.clone())
                        .with_model(self.openai_model.clone())
                        .with_timeout(self.request_timeout),
                )?;
                Ok(planner.with_text_generator(Arc::new(openai)))
            }
            None => Ok(planner),
        }
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

fn nonzero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN)
}

fn parse_default_addr() -> SocketAddr {
    DEFAULT_BIND_ADDR
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("GOOGLE_MAPS_API_KEY", "g-key")])).unwrap();

        assert_eq!(config.google_api_key, "g-key");
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.openai_model, "gpt-4.1-mini");
        assert_eq!(config.default_radius_km, 10);
        assert_eq!(config.sampling_step.get(), 10);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_ai_places_per_category, 3);
        assert_eq!(config.search_concurrency.get(), 4);
        assert_eq!(config.plan_deadline, Some(Duration::from_secs(60)));
        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse().unwrap());
    }

    #[test]
    fn missing_maps_key_is_a_configuration_error() {
        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GOOGLE_MAPS_API_KEY")));

        let err = AppConfig::from_lookup(lookup(&[("GOOGLE_MAPS_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_MODEL", "gpt-4.1"),
            ("DEFAULT_PLACES_RADIUS_KM", "25"),
            ("ROUTE_SAMPLING_STEP", "5"),
            ("REQUEST_TIMEOUT_SECONDS", "3"),
            ("MAX_AI_PLACES_PER_CATEGORY", "1"),
            ("SEARCH_CONCURRENCY", "8"),
            ("PLAN_DEADLINE_SECONDS", "0"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ]))
        .unwrap();

        assert_eq!(config.openai_api_key.as_deref(), Some("sk"));
        assert_eq!(config.openai_model, "gpt-4.1");
        assert_eq!(config.default_radius_km, 25);
        assert_eq!(config.sampling_step.get(), 5);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_ai_places_per_category, 1);
        assert_eq!(config.search_concurrency.get(), 8);
        assert_eq!(config.plan_deadline, None);
        assert_eq!(config.bind_addr.port(), 8080);

        let settings = config.planner_settings();
        assert_eq!(settings.default_radius_km, 25);
        assert_eq!(settings.deadline, None);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("ROUTE_SAMPLING_STEP", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ROUTE_SAMPLING_STEP", .. }));

        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("REQUEST_TIMEOUT_SECONDS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "REQUEST_TIMEOUT_SECONDS has invalid value \"soon\"");
    }

    #[test]
    fn default_radius_must_be_allowed() {
        let err = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("DEFAULT_PLACES_RADIUS_KM", "12"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DEFAULT_PLACES_RADIUS_KM", .. }));
    }

    #[test]
    fn planner_enables_enrichment_only_with_openai_key() {
        let without = AppConfig::from_lookup(lookup(&[("GOOGLE_MAPS_API_KEY", "g")])).unwrap();
        assert!(!without.build_planner().unwrap().enrichment_enabled());

        let with = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "g"),
            ("OPENAI_API_KEY", "sk"),
        ]))
        .unwrap();
        assert!(with.build_planner().unwrap().enrichment_enabled());
    }

    #[test]
    fn debug_output_hides_keys() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GOOGLE_MAPS_API_KEY", "secret-google"),
            ("OPENAI_API_KEY", "secret-openai"),
        ]))
        .unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
    }
}
