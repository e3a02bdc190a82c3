//! Reader for the DENUE shapefile distribution.
//!
//! INEGI publishes one point shapefile per state (e.g. `denue_31` for
//! Yucatán) with the attribute table in a dBASE sidecar. Geometry in a
//! projected CRS is converted to WGS84 using the `.prj` sidecar.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use denue_radius_registry_models::{Coordinate, Establishment};
use shapefile::dbase::encoding::EncodingRs;
use shapefile::dbase::{self, FieldValue, Record};
use shapefile::{Shape, ShapeReader};

use crate::crs::{self, Crs};
use crate::{RegistryError, encoding, fields::FieldMapping};

pub type ShapefileReader = shapefile::Reader<BufReader<File>, BufReader<File>>;

/// Opens a shapefile with its dBASE table decoded in the table's own
/// encoding (see [`encoding::dbf_encoding`]).
///
/// # Errors
///
/// Returns [`RegistryError::Shapefile`] if the `.shp` or `.dbf` cannot be
/// opened.
pub fn open(path: &Path) -> Result<ShapefileReader, RegistryError> {
    let shapes = ShapeReader::from_path(path)?;
    let mut table =
        dbase::Reader::from_path(path.with_extension("dbf")).map_err(shapefile::Error::from)?;

    if let Some(enc) = encoding::dbf_encoding(path, table.header().code_page_mark) {
        log::debug!("Decoding {} attributes as {}", path.display(), enc.name());
        table.set_encoding(EncodingRs::from(enc));
    }

    Ok(shapefile::Reader::new(shapes, table))
}

/// Reads all point shapes and their attributes.
///
/// # Errors
///
/// Returns [`RegistryError`] if the shapefile or its dBASE table cannot be
/// read, its `.prj` declares an unsupported CRS, or the code/name columns
/// are missing.
pub fn read(path: &Path, fields: &FieldMapping) -> Result<Vec<Establishment>, RegistryError> {
    let crs = crs::read_prj(path)?;
    let mut reader = open(path)?;
    let mut establishments = Vec::new();
    let mut skipped = 0_usize;

    for (idx, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        if let Some(establishment) = establishment_from(&shape, &record, &crs, fields)? {
            establishments.push(establishment);
        } else {
            log::debug!("Skipping shape {idx}: not a point");
            skipped += 1;
        }
    }

    if skipped > 0 {
        log::info!("Skipped {skipped} shapes without point geometry");
    }

    Ok(establishments)
}

/// Builds an establishment from one shape/record pair.
///
/// Point geometry is converted through `crs`. Coordinate attributes are
/// taken as geographic degrees whatever the layer CRS.
///
/// Returns `Ok(None)` for null or non-point shapes.
///
/// # Errors
///
/// Returns [`RegistryError::MissingField`] if the record lacks the code or
/// name column.
pub fn establishment_from(
    shape: &Shape,
    record: &Record,
    crs: &Crs,
    fields: &FieldMapping,
) -> Result<Option<Establishment>, RegistryError> {
    let geometry: Coordinate = match shape {
        Shape::Point(p) => crs.to_geographic(p.x, p.y),
        Shape::PointM(p) => crs.to_geographic(p.x, p.y),
        Shape::PointZ(p) => crs.to_geographic(p.x, p.y),
        _ => return Ok(None),
    };

    let text = |name: &str| -> Result<String, RegistryError> {
        record
            .get(name)
            .map(|v| field_text(v).unwrap_or_default())
            .ok_or_else(|| RegistryError::MissingField {
                field: name.to_string(),
            })
    };

    let code = text(&fields.code)?;
    let name = text(&fields.name)?;
    let latitude = record
        .get(&fields.latitude)
        .and_then(field_number)
        .unwrap_or(geometry.latitude);
    let longitude = record
        .get(&fields.longitude)
        .and_then(field_number)
        .unwrap_or(geometry.longitude);

    Ok(Some(Establishment {
        code,
        name,
        geometry,
        latitude,
        longitude,
    }))
}

/// Renders a dBASE value as text, or `None` for null and non-textual values.
#[must_use]
pub fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(s) => s.as_ref().map(|s| s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(n) => n.map(crate::fields::numeric_code),
        FieldValue::Float(f) => f.map(|f| crate::fields::numeric_code(f64::from(f))),
        FieldValue::Double(d) => Some(crate::fields::numeric_code(*d)),
        FieldValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn field_number(value: &FieldValue) -> Option<f64> {
    let number = match value {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Character(Some(s)) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entries: Vec<(&str, FieldValue)>) -> Record {
        let mut record = Record::default();
        for (name, value) in entries {
            record.insert(name.to_string(), value);
        }
        record
    }

    #[test]
    fn builds_establishment_from_point_and_record() {
        let shape = Shape::Point(shapefile::Point::new(-89.59, 21.01));
        let record = record(vec![
            ("codigo_act", FieldValue::Character(Some("462111 ".to_string()))),
            ("nom_estab", FieldValue::Character(Some("SUPER AKI".to_string()))),
            ("latitud", FieldValue::Numeric(Some(21.0102))),
            ("longitud", FieldValue::Numeric(Some(-89.5903))),
        ]);

        let e = establishment_from(&shape, &record, &Crs::Geographic, &FieldMapping::default())
            .unwrap()
            .unwrap();
        assert_eq!(e.code, "462111");
        assert_eq!(e.name, "SUPER AKI");
        assert!((e.geometry.latitude - 21.01).abs() < 1e-9);
        assert!((e.latitude - 21.0102).abs() < 1e-9);
        assert!((e.longitude + 89.5903).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_geometry_without_coordinate_attributes() {
        let shape = Shape::Point(shapefile::Point::new(-89.59, 21.01));
        let record = record(vec![
            ("codigo_act", FieldValue::Numeric(Some(462_112.0))),
            ("nom_estab", FieldValue::Character(Some("OXXO".to_string()))),
        ]);

        let e = establishment_from(&shape, &record, &Crs::Geographic, &FieldMapping::default())
            .unwrap()
            .unwrap();
        assert_eq!(e.code, "462112");
        assert!((e.latitude - 21.01).abs() < 1e-9);
        assert!((e.longitude + 89.59).abs() < 1e-9);
    }

    #[test]
    fn null_shapes_are_skipped() {
        let record = record(vec![]);
        assert!(
            establishment_from(&Shape::NullShape, &record, &Crs::Geographic, &FieldMapping::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn missing_code_column_is_an_error() {
        let shape = Shape::Point(shapefile::Point::new(-89.59, 21.01));
        let record = record(vec![(
            "nom_estab",
            FieldValue::Character(Some("OXXO".to_string())),
        )]);
        assert!(matches!(
            establishment_from(&shape, &record, &Crs::Geographic, &FieldMapping::default()),
            Err(RegistryError::MissingField { field }) if field == "codigo_act"
        ));
    }

    /// Writes a one-point DENUE-style shapefile in INEGI Lambert with a
    /// Windows-1252 table whose header carries no code page mark.
    fn write_projected_latin1_layer(dir: &Path) -> std::path::PathBuf {
        use shapefile::dbase::{TableWriterBuilder, encoding_rs::WINDOWS_1252};

        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("denue_inegi_31_.shp");

        let table = TableWriterBuilder::with_encoding(EncodingRs::from(WINDOWS_1252))
            .add_character_field("codigo_act".try_into().unwrap(), 6)
            .add_character_field("nom_estab".try_into().unwrap(), 40);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
        let record = record(vec![
            ("codigo_act", FieldValue::Character(Some("311812".to_string()))),
            (
                "nom_estab",
                FieldValue::Character(Some("PANADERÍA LA ESPIGA".to_string())),
            ),
        ]);
        writer
            .write_shape_and_record(&shapefile::Point::new(2_500_000.0, 0.0), &record)
            .unwrap();
        drop(writer);

        // Byte 29 of the dBASE header is the code page mark.
        let dbf = path.with_extension("dbf");
        let mut bytes = std::fs::read(&dbf).unwrap();
        bytes[29] = 0;
        std::fs::write(&dbf, bytes).unwrap();

        std::fs::write(path.with_extension("prj"), crate::crs::tests::INEGI_LCC).unwrap();
        path
    }

    #[test]
    fn reads_projected_layer_with_unmarked_latin1_table() {
        let dir = std::env::temp_dir().join("denue_radius_registry_projected_latin1");
        let path = write_projected_latin1_layer(&dir);

        let establishments = read(&path, &FieldMapping::default()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(establishments.len(), 1);
        let e = &establishments[0];
        assert_eq!(e.code, "311812");
        assert_eq!(e.name, "PANADERÍA LA ESPIGA");
        assert!(denue_radius_registry_models::CategoryMatcher::keyword("panadería").matches(e));

        assert!((e.geometry.latitude - 12.0).abs() < 1e-9);
        assert!((e.geometry.longitude + 102.0).abs() < 1e-9);
        assert!((e.latitude - 12.0).abs() < 1e-9);
    }

    #[test]
    fn projected_points_are_converted() {
        let crs = crate::crs::parse_wkt(crate::crs::tests::INEGI_LCC).unwrap();
        let shape = Shape::Point(shapefile::Point::new(2_500_000.0, 0.0));
        let record = record(vec![
            ("codigo_act", FieldValue::Character(Some("462111".to_string()))),
            ("nom_estab", FieldValue::Character(Some("SUPER AKI".to_string()))),
            ("latitud", FieldValue::Numeric(Some(12.0001))),
        ]);

        let e = establishment_from(&shape, &record, &crs, &FieldMapping::default())
            .unwrap()
            .unwrap();
        assert!((e.geometry.latitude - 12.0).abs() < 1e-9);
        assert!((e.geometry.longitude + 102.0).abs() < 1e-9);
        assert!((e.latitude - 12.0001).abs() < 1e-9);
        assert!((e.longitude + 102.0).abs() < 1e-9);
    }

    #[test]
    fn unsupported_projection_fails_the_load() {
        let dir = std::env::temp_dir().join("denue_radius_registry_unsupported_crs");
        let path = write_projected_latin1_layer(&dir);
        std::fs::write(
            path.with_extension("prj"),
            r#"PROJCS["Web_Mercator",GEOGCS["GCS_WGS_1984"],PROJECTION["Mercator_Auxiliary_Sphere"],UNIT["Meter",1.0]]"#,
        )
        .unwrap();

        let result = read(&path, &FieldMapping::default());
        std::fs::remove_dir_all(&dir).ok();
        assert!(matches!(result, Err(RegistryError::UnsupportedCrs { .. })));
    }
}
