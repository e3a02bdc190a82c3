//! Reader for `GeoJSON` `FeatureCollection` registry exports.

use denue_radius_registry_models::{Coordinate, Establishment};
use geojson::{Feature, GeoJson};

use crate::{RegistryError, coerce, fields::FieldMapping};

/// Reads point features from a `GeoJSON` document.
///
/// Non-point geometries and features without geometry are skipped.
/// `GeoJSON` has no schema, so absent code/name properties become empty
/// strings.
///
/// # Errors
///
/// Returns [`RegistryError`] if the document does not parse.
pub fn read(text: &str, fields: &FieldMapping) -> Result<Vec<Establishment>, RegistryError> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => Vec::new(),
    };

    let mut establishments = Vec::with_capacity(features.len());
    let mut skipped = 0_usize;

    for (idx, feature) in features.iter().enumerate() {
        let Some(point) = point_of(feature) else {
            log::debug!("Skipping feature {idx}: no point geometry");
            skipped += 1;
            continue;
        };

        let latitude = property_string(feature, &fields.latitude)
            .and_then(|v| coerce::coerce_component(&v).ok())
            .unwrap_or(point.latitude);
        let longitude = property_string(feature, &fields.longitude)
            .and_then(|v| coerce::coerce_component(&v).ok())
            .unwrap_or(point.longitude);

        establishments.push(Establishment {
            code: property_string(feature, &fields.code).unwrap_or_default(),
            name: property_string(feature, &fields.name).unwrap_or_default(),
            geometry: point,
            latitude,
            longitude,
        });
    }

    if skipped > 0 {
        log::info!("Skipped {skipped} features without point geometry");
    }

    Ok(establishments)
}

fn point_of(feature: &Feature) -> Option<Coordinate> {
    let geometry = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::Point(p) => Some(Coordinate::new(p.y(), p.x())),
        geo::Geometry::MultiPoint(mp) => mp.0.first().map(|p| Coordinate::new(p.y(), p.x())),
        _ => None,
    }
}

/// Reads a property as text; numbers are rendered without a trailing
/// `.0` so numeric activity codes compare equal to their string form.
#[must_use]
pub fn property_string(feature: &Feature, name: &str) -> Option<String> {
    match feature.property(name)? {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().map(crate::fields::numeric_code),
            |i| Some(i.to_string()),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-89.5905, 21.016] },
                "properties": { "codigo_act": 462111, "nom_estab": "SUPER AKI" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [-89.61, 20.99] },
                "properties": {
                    "codigo_act": "462112",
                    "nom_estab": "OXXO",
                    "latitud": "20.9948",
                    "longitud": -89.6129
                }
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": { "codigo_act": "462112", "nom_estab": "SIN GEOMETRIA" }
            },
            {
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[-89.6, 21.0], [-89.5, 21.1]]
                },
                "properties": { "codigo_act": "462112", "nom_estab": "LINEA" }
            }
        ]
    }"#;

    #[test]
    fn reads_point_features() {
        let establishments = read(SAMPLE, &FieldMapping::default()).unwrap();
        assert_eq!(establishments.len(), 2);

        assert_eq!(establishments[0].code, "462111");
        assert!((establishments[0].geometry.latitude - 21.016).abs() < 1e-9);
        assert!((establishments[0].latitude - 21.016).abs() < 1e-9);
    }

    #[test]
    fn attribute_coordinates_override_geometry_for_destination() {
        let establishments = read(SAMPLE, &FieldMapping::default()).unwrap();
        let oxxo = &establishments[1];
        assert!((oxxo.geometry.latitude - 20.99).abs() < 1e-9);
        assert!((oxxo.latitude - 20.9948).abs() < 1e-9);
        assert!((oxxo.longitude + 89.6129).abs() < 1e-9);
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(matches!(
            read("{ not json", &FieldMapping::default()),
            Err(RegistryError::GeoJson(_))
        ));
    }
}
