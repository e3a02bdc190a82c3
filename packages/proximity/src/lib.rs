#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Radius counts and nearest-establishment distances.
//!
//! Given a loaded [`Registry`](denue_radius_registry::Registry), a list of
//! categories and a list of query points, [`search::search_batch`]
//! produces a [`table::FeatureTable`] with, per category, the number of
//! establishments inside a circular buffer around each point and the
//! distance (or driving time) to the nearest establishment anywhere in the
//! registry.
//!
//! Work is strictly sequential. In driving mode each point costs one
//! routing request per category and the batch stops at the first failure.

pub mod buffer;
pub mod progress;
pub mod scale;
pub mod search;
pub mod table;

use denue_radius_registry::RegistryError;
use denue_radius_routing::RoutingError;
use thiserror::Error;

pub use scale::MetricScale;
pub use search::{DistanceMode, ProximityResult, SearchOptions, search_batch, search_point};
pub use table::FeatureTable;

/// Errors from proximity searches.
#[derive(Debug, Error)]
pub enum ProximityError {
    /// The routing service failed.
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// The search radius is negative or not finite.
    #[error("Invalid search radius: {radius_m} m")]
    InvalidRadius {
        /// Offending radius in meters.
        radius_m: f64,
    },

    /// A query point is not a valid coordinate.
    #[error("Invalid query point #{index}: {source}")]
    InvalidQuery {
        /// Position of the point in the batch.
        index: usize,
        /// Validation failure.
        source: RegistryError,
    },

    /// The routing service returned a different number of durations than
    /// destinations requested.
    #[error("Routing returned {actual} durations for {expected} destinations")]
    RoutingMismatch {
        /// Destinations sent.
        expected: usize,
        /// Durations received.
        actual: usize,
    },
}
