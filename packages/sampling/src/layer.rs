//! Polygon layers with attributes.
//!
//! Shapefile geometry is converted to WGS84 through the layer's `.prj`,
//! so centroids are always geographic.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use denue_radius_registry::crs::{self, Crs};
use denue_radius_registry::{LayerFormat, geojson_layer, shapefile_layer};
use geo::{Centroid, LineString, MultiPolygon, Polygon};
use geojson::GeoJson;
use shapefile::dbase::FieldValue;
use shapefile::record::traits::HasXY;
use shapefile::{PolygonRing, Shape};

use crate::SamplingError;

/// One polygon feature and its attributes rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    /// Attribute values keyed by column name.
    pub attributes: BTreeMap<String, String>,
    /// Feature geometry.
    pub geometry: MultiPolygon<f64>,
}

impl PolygonFeature {
    /// Attribute value by column name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Area-weighted centroid, `None` for empty geometries.
    #[must_use]
    pub fn centroid(&self) -> Option<geo::Point<f64>> {
        self.geometry.centroid()
    }
}

/// Loads a polygon layer from a shapefile or `GeoJSON` file.
///
/// Features without polygon geometry are skipped.
///
/// # Errors
///
/// Returns [`SamplingError`] if the file cannot be read or is a CSV.
pub fn load(path: &Path) -> Result<Vec<PolygonFeature>, SamplingError> {
    let features = match LayerFormat::from_path(path)? {
        LayerFormat::Shapefile => read_shapefile(path)?,
        LayerFormat::GeoJson => read_geojson(&std::fs::read_to_string(path)?)?,
        LayerFormat::Csv => {
            return Err(SamplingError::Unsupported {
                message: format!("{} has no polygon geometry", path.display()),
            });
        }
    };

    log::info!("Loaded {} polygons from {}", features.len(), path.display());
    Ok(features)
}

fn read_shapefile(path: &Path) -> Result<Vec<PolygonFeature>, SamplingError> {
    let crs = crs::read_prj(path)?;
    let mut reader = shapefile_layer::open(path)?;
    let mut features = Vec::new();
    let mut skipped = 0_usize;

    for (idx, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let geometry = match &shape {
            Shape::Polygon(polygon) => rings_to_multipolygon(polygon.rings(), &crs),
            Shape::PolygonM(polygon) => rings_to_multipolygon(polygon.rings(), &crs),
            Shape::PolygonZ(polygon) => rings_to_multipolygon(polygon.rings(), &crs),
            other => {
                log::debug!("Skipping shape {idx}: {} is not a polygon", other.shapetype());
                skipped += 1;
                continue;
            }
        };

        let attributes = HashMap::<String, FieldValue>::from(record)
            .into_iter()
            .filter_map(|(name, value)| shapefile_layer::field_text(&value).map(|v| (name, v)))
            .collect();

        features.push(PolygonFeature {
            attributes,
            geometry,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} shapes without polygon geometry in {}", path.display());
    }

    Ok(features)
}

/// Groups shapefile rings into polygons: each outer ring starts a polygon
/// and following inner rings become its holes. Vertices are converted to
/// geographic coordinates through `crs`.
fn rings_to_multipolygon<P: HasXY>(rings: &[PolygonRing<P>], crs: &Crs) -> MultiPolygon<f64> {
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in rings {
        let line: LineString<f64> = ring
            .points()
            .iter()
            .map(|p| {
                let c = crs.to_geographic(p.x(), p.y());
                (c.longitude, c.latitude)
            })
            .collect();
        match ring {
            PolygonRing::Outer(_) => polygons.push((line, Vec::new())),
            PolygonRing::Inner(_) => {
                if let Some((_, holes)) = polygons.last_mut() {
                    holes.push(line);
                }
            }
        }
    }

    MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}

/// Reads polygon features from a `GeoJSON` document.
///
/// # Errors
///
/// Returns [`SamplingError::GeoJson`] if the document does not parse.
pub fn read_geojson(text: &str) -> Result<Vec<PolygonFeature>, SamplingError> {
    let GeoJson::FeatureCollection(fc) = text.parse::<GeoJson>()? else {
        return Err(SamplingError::Unsupported {
            message: "expected a FeatureCollection".to_string(),
        });
    };

    let mut features = Vec::with_capacity(fc.features.len());
    for feature in &fc.features {
        let Some(geometry) = feature.geometry.clone() else {
            continue;
        };
        let geometry = match geo::Geometry::<f64>::try_from(geometry) {
            Ok(geo::Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
            Ok(geo::Geometry::MultiPolygon(mp)) => mp,
            _ => continue,
        };

        let attributes = feature
            .properties
            .iter()
            .flat_map(|props| props.keys())
            .filter_map(|key| {
                geojson_layer::property_string(feature, key).map(|v| (key.clone(), v))
            })
            .collect();

        features.push(PolygonFeature {
            attributes,
            geometry,
        });
    }

    Ok(features)
}

/// Keeps features whose `field` equals `value` (after trimming).
#[must_use]
pub fn filter_by_attribute(
    features: Vec<PolygonFeature>,
    field: &str,
    value: &str,
) -> Vec<PolygonFeature> {
    let value = value.trim();
    features
        .into_iter()
        .filter(|f| f.attribute(field).is_some_and(|v| v == value))
        .collect()
}
