//! Query point CSV files.
//!
//! Columns are matched case-insensitively against a few accepted names so
//! both English headers and the Spanish ones used in INEGI extracts work.
//! The id column is optional.

use std::io::{Read, Write};

use denue_radius_registry::coerce;
use denue_radius_registry_models::QueryPoint;

use crate::SamplingError;

/// Accepted names for the id column.
pub const ID_COLUMNS: &[&str] = &["id", "cvegeo"];
/// Accepted names for the latitude column.
pub const LATITUDE_COLUMNS: &[&str] = &["latitude", "latitud", "lat"];
/// Accepted names for the longitude column.
pub const LONGITUDE_COLUMNS: &[&str] = &["longitude", "longitud", "lon", "lng"];

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim_start_matches('\u{feff}').trim().to_lowercase();
        candidates.contains(&h.as_str())
    })
}

fn require_column(
    headers: &csv::StringRecord,
    candidates: &[&str],
) -> Result<usize, SamplingError> {
    find_column(headers, candidates).ok_or_else(|| SamplingError::MissingColumn {
        candidates: candidates.iter().map(ToString::to_string).collect(),
    })
}

/// Reads query points from CSV with a header row.
///
/// # Errors
///
/// Returns [`SamplingError::MissingColumn`] if no latitude or longitude
/// column is present, or [`SamplingError::Registry`] if a row holds an
/// unusable coordinate.
pub fn read_points_csv(reader: impl Read) -> Result<Vec<QueryPoint>, SamplingError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let id_idx = find_column(&headers, ID_COLUMNS);
    let lat_idx = require_column(&headers, LATITUDE_COLUMNS)?;
    let lon_idx = require_column(&headers, LONGITUDE_COLUMNS)?;

    let mut points = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let coordinate = coerce::coerce_pair(
            record.get(lat_idx).unwrap_or_default(),
            record.get(lon_idx).unwrap_or_default(),
        )
        .inspect_err(|e| log::error!("Query point row {}: {e}", row + 1))?;

        let id = id_idx
            .and_then(|idx| record.get(idx))
            .filter(|v| !v.is_empty())
            .map(String::from);

        points.push(QueryPoint { id, coordinate });
    }

    log::debug!("Read {} query points", points.len());
    Ok(points)
}

/// Writes query points as `id,latitude,longitude`.
///
/// # Errors
///
/// Returns [`SamplingError::Csv`] if writing fails.
pub fn write_points_csv(points: &[QueryPoint], writer: impl Write) -> Result<(), SamplingError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["id", "latitude", "longitude"])?;
    for point in points {
        csv_writer.write_record([
            point.id.clone().unwrap_or_default(),
            point.coordinate.latitude.to_string(),
            point.coordinate.longitude.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_english_headers_with_ids() {
        let text = "id,latitude,longitude\nA1,21.015963,-89.590495\nA2,20.994841,-89.612894\n";
        let points = read_points_csv(text.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], QueryPoint::with_id("A1", 21.015_963, -89.590_495));
    }

    #[test]
    fn reads_spanish_headers_without_ids() {
        let text = "LATITUD,LONGITUD\n21.0, -89.6\n";
        let points = read_points_csv(text.as_bytes()).unwrap();
        assert_eq!(points, vec![QueryPoint::new(21.0, -89.6)]);
    }

    #[test]
    fn cvegeo_counts_as_id() {
        let text = "CVEGEO,lat,lon\n3105000010234001,21.0,-89.6\n";
        let points = read_points_csv(text.as_bytes()).unwrap();
        assert_eq!(points[0].id.as_deref(), Some("3105000010234001"));
    }

    #[test]
    fn missing_longitude_column_is_reported() {
        let text = "id,latitude\nA1,21.0\n";
        assert!(matches!(
            read_points_csv(text.as_bytes()),
            Err(SamplingError::MissingColumn { .. })
        ));
    }

    #[test]
    fn bad_coordinate_fails_the_file() {
        let text = "latitude,longitude\n21.0,-89.6\n95.0,-89.6\n";
        assert!(matches!(
            read_points_csv(text.as_bytes()),
            Err(SamplingError::Registry(_))
        ));
    }

    #[test]
    fn written_points_read_back() {
        let points = vec![
            QueryPoint::with_id("B1", 21.001, -89.599),
            QueryPoint::new(20.9, -89.7),
        ];
        let mut buf = Vec::new();
        write_points_csv(&points, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("id,latitude,longitude\nB1,21.001,-89.599\n,20.9,-89.7"));
        assert_eq!(read_points_csv(text.as_bytes()).unwrap(), points);
    }
}
