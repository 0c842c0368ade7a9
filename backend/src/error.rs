use std::time::Duration;

use thiserror::Error;

use crate::models::FailureKind;

pub const ALLOWED_RADII_KM: [u32; 5] = [5, 10, 15, 25, 50];

/// Bad request shape, always detected before any provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid JSON body")]
    MalformedBody,
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("trip_date must be YYYY-MM-DD")]
    InvalidDate,
    #[error("preferences must name at least one category")]
    NoPreferences,
    #[error("Invalid preferences: {}", .0.join(", "))]
    UnknownPreferences(Vec<String>),
    #[error("places_radius_km must be an integer")]
    RadiusNotInteger,
    #[error("places_radius_km must be one of {ALLOWED_RADII_KM:?}")]
    RadiusNotAllowed(i64),
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{0}")]
    NotFound(String),
    #[error("{service} request timed out")]
    Timeout { service: &'static str },
    #[error("{service} request failed with status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} reported {code}: {message}")]
    Service {
        service: &'static str,
        code: String,
        message: String,
    },
    #[error("{service} returned an unusable response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Terminal failure of one trip-planning call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ExternalService(String),
    #[error("trip planning did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlannerError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::NotFound(_) => FailureKind::NotFound,
            Self::ExternalService(_) => FailureKind::ExternalService,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Internal(_) => FailureKind::Internal,
        }
    }
}

impl From<ProviderError> for PlannerError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(message) => Self::NotFound(message),
            other => Self::ExternalService(other.to_string()),
        }
    }
}
