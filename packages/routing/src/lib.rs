#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Driving-time lookups against an external routing service.
//!
//! Proximity search only needs one thing from a router: the travel time
//! from one origin to a list of destinations. That contract is the
//! [`TravelTimeProvider`] trait; [`distance_matrix::DistanceMatrixClient`]
//! implements it against the Google Distance Matrix API.
//!
//! There is no retry or backoff. Any network, status or parsing failure
//! is returned to the caller as a [`RoutingError`].

pub mod distance_matrix;
pub mod duration;

use async_trait::async_trait;
use denue_radius_registry_models::Coordinate;
use thiserror::Error;

/// Maximum origins x destinations per request accepted by the service.
pub const MAX_MATRIX_ELEMENTS: usize = 100;

/// Errors from routing requests.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-OK status.
    #[error("Routing service returned status {status}: {message}")]
    Status {
        /// Status string from the response (e.g. `"REQUEST_DENIED"`).
        status: String,
        /// Accompanying error message, if any.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// A duration string could not be converted to minutes.
    #[error("Unrecognised duration text: '{text}'")]
    Duration {
        /// The offending text.
        text: String,
    },

    /// The request would exceed [`MAX_MATRIX_ELEMENTS`].
    #[error("Too many destinations: {count} (limit {MAX_MATRIX_ELEMENTS})")]
    TooManyDestinations {
        /// Number of destinations requested.
        count: usize,
    },
}

/// Source of travel times from one origin to many destinations.
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Returns the travel time in minutes to each destination, in the
    /// same order as `destinations`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the lookup fails for any destination.
    async fn durations(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<f64>, RoutingError>;
}
