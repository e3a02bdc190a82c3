//! Google Distance Matrix API client.
//!
//! One request per query point: the point is the single origin and the
//! nearest candidates are the destinations, so a request never exceeds
//! [`MAX_MATRIX_ELEMENTS`] elements.
//!
//! See <https://developers.google.com/maps/documentation/distance-matrix/distance-matrix>

use std::time::Duration;

use async_trait::async_trait;
use denue_radius_registry_models::Coordinate;
use serde::Deserialize;

use crate::{MAX_MATRIX_ELEMENTS, RoutingError, TravelTimeProvider, duration};

/// Public JSON endpoint of the Distance Matrix API.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Routing settings as read from the `[routing]` configuration table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Endpoint URL.
    pub base_url: String,
    /// API key. Usually supplied through the environment instead.
    pub api_key: Option<String>,
    /// Travel mode sent to the service.
    pub mode: String,
    /// Unit system sent to the service. Durations are unaffected.
    pub units: String,
    /// Optional per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            mode: "driving".to_string(),
            units: "imperial".to_string(),
            timeout_secs: None,
        }
    }
}

/// Client for driving durations from one origin to many destinations.
#[derive(Debug, Clone)]
pub struct DistanceMatrixClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    mode: String,
    units: String,
    timeout: Option<Duration>,
}

impl DistanceMatrixClient {
    /// Creates a client for `api_key` using the settings in `config`.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, config: &RoutingConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            mode: config.mode.clone(),
            units: config.units.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Fetches durations in minutes to each destination.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if there are more than
    /// [`MAX_MATRIX_ELEMENTS`] destinations, the request fails, or the
    /// response is malformed.
    pub async fn fetch(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<f64>, RoutingError> {
        if destinations.len() > MAX_MATRIX_ELEMENTS {
            return Err(RoutingError::TooManyDestinations {
                count: destinations.len(),
            });
        }
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        log::debug!(
            "Requesting {} {} durations from {}",
            destinations.len(),
            self.mode,
            origin.to_lat_lon_string()
        );

        let origins = origin.to_lat_lon_string();
        let destinations_param = destinations_param(destinations);

        let mut req = self.client.get(&self.base_url).query(&[
            ("units", self.units.as_str()),
            ("origins", origins.as_str()),
            ("destinations", destinations_param.as_str()),
            ("mode", self.mode.as_str()),
            ("key", self.api_key.as_str()),
        ]);

        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await?.error_for_status()?;
        let body: serde_json::Value = resp.json().await?;

        parse_response(&body, destinations.len())
    }
}

#[async_trait]
impl TravelTimeProvider for DistanceMatrixClient {
    async fn durations(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<f64>, RoutingError> {
        self.fetch(origin, destinations).await
    }
}

/// Joins destinations as `lat,lon|lat,lon|...`.
#[must_use]
pub fn destinations_param(destinations: &[Coordinate]) -> String {
    destinations
        .iter()
        .map(Coordinate::to_lat_lon_string)
        .collect::<Vec<_>>()
        .join("|")
}

/// Extracts per-destination durations (minutes) from a response body.
///
/// # Errors
///
/// Returns [`RoutingError`] if the top-level or any element status is not
/// `OK`, fields are missing, the element count differs from `expected`,
/// or a duration text does not parse.
pub fn parse_response(body: &serde_json::Value, expected: usize) -> Result<Vec<f64>, RoutingError> {
    let status = body["status"].as_str().ok_or_else(|| RoutingError::Parse {
        message: "Missing status in distance matrix response".to_string(),
    })?;

    if status != "OK" {
        return Err(RoutingError::Status {
            status: status.to_string(),
            message: body["error_message"].as_str().unwrap_or_default().to_string(),
        });
    }

    let elements = body["rows"][0]["elements"]
        .as_array()
        .ok_or_else(|| RoutingError::Parse {
            message: "Missing rows[0].elements array".to_string(),
        })?;

    if elements.len() != expected {
        return Err(RoutingError::Parse {
            message: format!(
                "Expected {expected} elements, response has {}",
                elements.len()
            ),
        });
    }

    elements
        .iter()
        .enumerate()
        .map(|(idx, element)| {
            let element_status = element["status"].as_str().unwrap_or("OK");
            if element_status != "OK" {
                return Err(RoutingError::Status {
                    status: element_status.to_string(),
                    message: format!("element {idx}"),
                });
            }

            let text = element["duration"]["text"]
                .as_str()
                .ok_or_else(|| RoutingError::Parse {
                    message: format!("Missing duration.text in element {idx}"),
                })?;

            duration::parse_duration_minutes(text)
        })
        .collect()
}
