#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Query point files and polygon-layer sampling.
//!
//! Scoring usually runs over a sample of city blocks: a polygon layer
//! (e.g. the INEGI block layer `manzanas`) is filtered to one
//! municipality, a seeded random sample is drawn, and each polygon's
//! centroid becomes a [`QueryPoint`] keyed by its block key.
//!
//! [`points`] reads and writes those query points as CSV.
//!
//! [`QueryPoint`]: denue_radius_registry_models::QueryPoint

pub mod layer;
pub mod points;
pub mod sample;

use thiserror::Error;

/// Errors from polygon layers and point files.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shapefile or dBASE sidecar could not be read.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Registry-level failure (format detection, coordinate coercion).
    #[error("{0}")]
    Registry(#[from] denue_radius_registry::RegistryError),

    /// A required column is missing from a point file.
    #[error("Missing column: expected one of {candidates:?}")]
    MissingColumn {
        /// Accepted column names.
        candidates: Vec<String>,
    },

    /// The layer is not a polygon layer.
    #[error("Unsupported polygon layer: {message}")]
    Unsupported {
        /// Description of the problem.
        message: String,
    },
}
