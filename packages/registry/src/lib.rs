#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! DENUE business registry loading and category filtering.
//!
//! The registry is a point layer of economic establishments published by
//! INEGI. It is distributed per state as a shapefile and as bulk CSV;
//! GeoJSON exports are also accepted. Whatever the format, each row is
//! normalised into an [`Establishment`] using a [`FieldMapping`] and the
//! whole layer is held in memory, read-only, for the duration of a batch.
//!
//! Shapefile geometry is converted to geographic WGS84 when the `.prj`
//! sidecar declares a supported projection (see [`crs`]). CSV and
//! `GeoJSON` layers are read as WGS84 degrees.

pub mod coerce;
pub mod crs;
pub mod csv_layer;
pub mod encoding;
pub mod fields;
pub mod geojson_layer;
pub mod shapefile_layer;

use std::collections::BTreeMap;
use std::path::Path;

use denue_radius_registry_models::{Category, Establishment};
use thiserror::Error;

pub use fields::FieldMapping;

/// Errors from registry loading and coordinate coercion.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// I/O error reading a layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shapefile or dBASE sidecar could not be read.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The file extension does not name a supported layer format.
    #[error("Unsupported registry format: {path}")]
    UnsupportedFormat {
        /// Offending path.
        path: String,
    },

    /// A required attribute column is absent from the layer.
    #[error("Missing field '{field}' in registry layer")]
    MissingField {
        /// Column name from the [`FieldMapping`].
        field: String,
    },

    /// The `.prj` sidecar declares a CRS that cannot be converted to WGS84.
    #[error("Unsupported coordinate reference system: {crs}")]
    UnsupportedCrs {
        /// Projection method or leading WKT text.
        crs: String,
    },

    /// A coordinate value could not be coerced to a valid number.
    #[error("Invalid coordinate: {message}")]
    Coordinate {
        /// Description of the bad value.
        message: String,
    },
}

/// Layer formats the registry can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerFormat {
    /// ESRI shapefile with a dBASE attribute table.
    Shapefile,
    /// Delimited text with latitude/longitude columns.
    Csv,
    /// `GeoJSON` `FeatureCollection`.
    GeoJson,
}

impl LayerFormat {
    /// Determines the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnsupportedFormat`] for unknown extensions.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("shp") => Ok(Self::Shapefile),
            Some("csv") => Ok(Self::Csv),
            Some("geojson" | "json") => Ok(Self::GeoJson),
            _ => Err(RegistryError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// The in-memory candidate pool.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    establishments: Vec<Establishment>,
}

impl Registry {
    #[must_use]
    pub const fn new(establishments: Vec<Establishment>) -> Self {
        Self { establishments }
    }

    /// Loads a registry layer, picking the reader from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the format is unsupported or the layer
    /// cannot be read.
    pub fn load(path: &Path, fields: &FieldMapping) -> Result<Self, RegistryError> {
        let format = LayerFormat::from_path(path)?;
        log::info!("Loading registry {} as {format:?}", path.display());

        let establishments = match format {
            LayerFormat::Shapefile => shapefile_layer::read(path, fields)?,
            LayerFormat::Csv => csv_layer::read(std::fs::File::open(path)?, fields)?,
            LayerFormat::GeoJson => {
                geojson_layer::read(&std::fs::read_to_string(path)?, fields)?
            }
        };

        log::info!("Loaded {} establishments", establishments.len());
        Ok(Self::new(establishments))
    }

    #[must_use]
    pub fn establishments(&self) -> &[Establishment] {
        &self.establishments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.establishments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.establishments.is_empty()
    }

    /// Establishments belonging to `category`, in registry order.
    #[must_use]
    pub fn candidates(&self, category: &Category) -> Vec<&Establishment> {
        self.establishments
            .iter()
            .filter(|e| category.matcher.matches(e))
            .collect()
    }

    /// Number of establishments per activity code, most common first.
    /// Ties are broken by code.
    #[must_use]
    pub fn code_counts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for e in &self.establishments {
            *counts.entry(e.code.as_str()).or_default() += 1;
        }

        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(code, n)| (code.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}
