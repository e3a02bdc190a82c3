//! Reader for the DENUE bulk CSV distribution.
//!
//! The CSV has no geometry column; the latitude/longitude attributes
//! double as the point geometry. Older state extracts are Latin-1
//! encoded; fields that are not valid UTF-8 are decoded as Windows-1252.

use std::io::Read;

use denue_radius_registry_models::{Coordinate, Establishment};

use crate::{RegistryError, coerce, encoding, fields::FieldMapping};

/// Reads establishments from CSV with a header row.
///
/// Rows whose coordinates cannot be coerced are skipped.
///
/// # Errors
///
/// Returns [`RegistryError`] if the CSV is malformed or a mapped column
/// is missing from the header.
pub fn read(reader: impl Read, fields: &FieldMapping) -> Result<Vec<Establishment>, RegistryError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.byte_headers()?.clone();
    let column = |name: &str| -> Result<usize, RegistryError> {
        headers
            .iter()
            .position(|h| encoding::decode(h).trim_start_matches('\u{feff}') == name)
            .ok_or_else(|| RegistryError::MissingField {
                field: name.to_string(),
            })
    };

    let code_idx = column(&fields.code)?;
    let name_idx = column(&fields.name)?;
    let lat_idx = column(&fields.latitude)?;
    let lon_idx = column(&fields.longitude)?;

    let mut establishments = Vec::new();
    let mut skipped = 0_usize;

    for (row, record) in csv_reader.byte_records().enumerate() {
        let record = record?;
        let get = |idx: usize| {
            record
                .get(idx)
                .map(|v| encoding::decode(v).into_owned())
                .unwrap_or_default()
        };

        let Ok(Coordinate {
            latitude,
            longitude,
        }) = coerce::coerce_pair(&get(lat_idx), &get(lon_idx))
        else {
            log::debug!("Skipping CSV row {row}: unusable coordinates");
            skipped += 1;
            continue;
        };

        establishments.push(Establishment {
            code: get(code_idx),
            name: get(name_idx),
            geometry: Coordinate::new(latitude, longitude),
            latitude,
            longitude,
        });
    }

    if skipped > 0 {
        log::info!("Skipped {skipped} CSV rows without usable coordinates");
    }

    Ok(establishments)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,nom_estab,codigo_act,latitud,longitud
1,SUPER AKI,462111,21.0160,-89.5905
2,OXXO CENTRO,462112,20.9948,-89.6129
3,SIN UBICACION,462112,,
";

    #[test]
    fn reads_rows_and_skips_missing_coordinates() {
        let establishments = read(SAMPLE.as_bytes(), &FieldMapping::default()).unwrap();
        assert_eq!(establishments.len(), 2);

        let first = &establishments[0];
        assert_eq!(first.code, "462111");
        assert_eq!(first.name, "SUPER AKI");
        assert!((first.latitude - 21.016).abs() < 1e-9);
        assert!((first.geometry.longitude + 89.5905).abs() < 1e-9);
    }

    #[test]
    fn missing_column_is_an_error() {
        let csv = "nom_estab,latitud,longitud\nA,21,-89\n";
        let err = read(csv.as_bytes(), &FieldMapping::default()).unwrap_err();
        assert!(matches!(err, RegistryError::MissingField { field } if field == "codigo_act"));
    }

    #[test]
    fn honours_custom_field_mapping() {
        let csv = "CODE,NAME,LAT,LON\n611121,COLEGIO,21.1,-89.6\n";
        let fields = FieldMapping {
            code: "CODE".to_string(),
            name: "NAME".to_string(),
            latitude: "LAT".to_string(),
            longitude: "LON".to_string(),
        };
        let establishments = read(csv.as_bytes(), &fields).unwrap();
        assert_eq!(establishments[0].code, "611121");
    }

    #[test]
    fn tolerates_byte_order_mark() {
        let csv = "\u{feff}codigo_act,nom_estab,latitud,longitud\n462111,A,21,-89\n";
        let establishments = read(csv.as_bytes(), &FieldMapping::default()).unwrap();
        assert_eq!(establishments.len(), 1);
    }

    #[test]
    fn decodes_latin1_names() {
        let mut csv = b"codigo_act,nom_estab,latitud,longitud\n".to_vec();
        csv.extend_from_slice(b"311812,PANADER\xCDA LA ESPIGA,21.0,-89.6\n");
        csv.extend_from_slice("311812,PANADERÍA SAN JUAN,21.1,-89.6\n".as_bytes());

        let establishments = read(csv.as_slice(), &FieldMapping::default()).unwrap();
        assert_eq!(establishments[0].name, "PANADERÍA LA ESPIGA");
        assert_eq!(establishments[1].name, "PANADERÍA SAN JUAN");

        let matcher = denue_radius_registry_models::CategoryMatcher::keyword("panadería");
        assert!(establishments.iter().all(|e| matcher.matches(e)));
    }
}
