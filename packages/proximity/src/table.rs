//! Feature table: one row per query point, two columns per category.

use std::fmt;
use std::io::Write;

use denue_radius_registry_models::QueryPoint;

use crate::search::ProximityResult;

/// Suffix of the count column.
pub const COUNT_SUFFIX: &str = "_count";

/// What the second column of a category holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Linear distance in meters.
    DistanceMeters,
    /// Travel time in minutes.
    DurationMinutes,
}

impl Metric {
    /// Suffix of the distance/duration column.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::DistanceMeters => "_distance_m",
            Self::DurationMinutes => "_duration_min",
        }
    }
}

/// Results of one category for every query point.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryColumn {
    /// Column prefix.
    pub label: String,
    /// What [`ProximityResult::value`] measures.
    pub metric: Metric,
    /// One result per query point, in query order.
    pub results: Vec<ProximityResult>,
}

/// Query points with their per-category results.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    points: Vec<QueryPoint>,
    columns: Vec<CategoryColumn>,
}

impl FeatureTable {
    #[must_use]
    pub const fn new(points: Vec<QueryPoint>, columns: Vec<CategoryColumn>) -> Self {
        Self { points, columns }
    }

    #[must_use]
    pub fn points(&self) -> &[QueryPoint] {
        &self.points
    }

    #[must_use]
    pub fn columns(&self) -> &[CategoryColumn] {
        &self.columns
    }

    fn has_ids(&self) -> bool {
        self.points.iter().any(|p| p.id.is_some())
    }

    /// Column headers in output order.
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(3 + self.columns.len() * 2);
        if self.has_ids() {
            headers.push("id".to_string());
        }
        headers.push("latitude".to_string());
        headers.push("longitude".to_string());
        for column in &self.columns {
            headers.push(format!("{}{COUNT_SUFFIX}", column.label));
            headers.push(format!("{}{}", column.label, column.metric.suffix()));
        }
        headers
    }

    /// Cell values, one row per query point. Missing values are empty.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        let has_ids = self.has_ids();
        self.points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let mut row = Vec::with_capacity(3 + self.columns.len() * 2);
                if has_ids {
                    row.push(point.id.clone().unwrap_or_default());
                }
                row.push(point.coordinate.latitude.to_string());
                row.push(point.coordinate.longitude.to_string());
                for column in &self.columns {
                    let result = &column.results[i];
                    row.push(result.count.to_string());
                    row.push(result.value().map(|v| v.to_string()).unwrap_or_default());
                }
                row
            })
            .collect()
    }

    /// Writes the table as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`csv::Error`] if writing fails.
    pub fn write_csv(&self, writer: impl Write) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.headers())?;
        for row in self.rows() {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for FeatureTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers = self.headers();
        let rows = self.rows();

        // Padding counts chars, so widths must too.
        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let separator = format!("+{separator}+");

        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            write!(f, "|")?;
            for (cell, &width) in cells.iter().zip(&widths) {
                write!(f, " {cell:>width$} |")?;
            }
            writeln!(f)
        };

        writeln!(f, "{separator}")?;
        write_row(f, &headers)?;
        writeln!(f, "{separator}")?;
        for row in &rows {
            write_row(f, row)?;
        }
        write!(f, "{separator}")
    }
}

#[cfg(test)]
mod tests {
    use denue_radius_registry_models::Coordinate;

    use super::*;
    use crate::search::Nearest;

    fn found(count: usize, value: f64) -> ProximityResult {
        ProximityResult {
            count,
            nearest: Some(Nearest {
                value,
                code: "462111".to_string(),
                name: "SUPER".to_string(),
                coordinate: Coordinate::new(21.0, -89.6),
            }),
        }
    }

    fn table(points: Vec<QueryPoint>) -> FeatureTable {
        FeatureTable::new(
            points,
            vec![
                CategoryColumn {
                    label: "supermercado".to_string(),
                    metric: Metric::DistanceMeters,
                    results: vec![found(2, 904.3), found(4, 888.52)],
                },
                CategoryColumn {
                    label: "hospital".to_string(),
                    metric: Metric::DistanceMeters,
                    results: vec![ProximityResult::empty(), ProximityResult::empty()],
                },
            ],
        )
    }

    #[test]
    fn headers_pair_count_and_metric_per_category() {
        let t = table(vec![
            QueryPoint::new(21.015_963, -89.590_495),
            QueryPoint::new(20.994_841, -89.612_894),
        ]);
        assert_eq!(
            t.headers(),
            vec![
                "latitude",
                "longitude",
                "supermercado_count",
                "supermercado_distance_m",
                "hospital_count",
                "hospital_distance_m",
            ]
        );
    }

    #[test]
    fn id_column_only_when_points_have_ids() {
        let t = table(vec![
            QueryPoint::with_id("3105000010234001", 21.0, -89.6),
            QueryPoint::new(20.9, -89.6),
        ]);
        assert_eq!(t.headers()[0], "id");
        assert_eq!(t.rows()[1][0], "");
    }

    #[test]
    fn missing_values_are_empty_cells() {
        let t = table(vec![QueryPoint::new(21.0, -89.6), QueryPoint::new(20.9, -89.6)]);
        let rows = t.rows();
        assert_eq!(rows[0], vec!["21", "-89.6", "2", "904.3", "0", ""]);
    }

    #[test]
    fn writes_csv() {
        let t = table(vec![QueryPoint::new(21.0, -89.6), QueryPoint::new(20.9, -89.6)]);
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "latitude,longitude,supermercado_count,supermercado_distance_m,hospital_count,hospital_distance_m"
        );
        assert_eq!(lines.next().unwrap(), "21,-89.6,2,904.3,0,");
        assert_eq!(lines.next().unwrap(), "20.9,-89.6,4,888.52,0,");
        assert!(lines.next().is_none());
    }

    #[test]
    fn duration_columns_use_minutes_suffix() {
        let t = FeatureTable::new(
            vec![QueryPoint::new(21.0, -89.6)],
            vec![CategoryColumn {
                label: "minisuper".to_string(),
                metric: Metric::DurationMinutes,
                results: vec![found(1, 65.0)],
            }],
        );
        assert_eq!(t.headers()[3], "minisuper_duration_min");
        assert_eq!(t.rows()[0][3], "65");
    }

    #[test]
    fn display_renders_aligned_grid() {
        let t = table(vec![QueryPoint::new(21.0, -89.6), QueryPoint::new(20.9, -89.6)]);
        let rendered = t.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("+-"));
        assert!(lines[1].contains("supermercado_distance_m"));
        let width = lines[0].len();
        assert!(lines.iter().all(|l| l.len() == width));
    }

    #[test]
    fn display_aligns_accented_labels() {
        let t = FeatureTable::new(
            vec![QueryPoint::with_id("Mérida", 21.0, -89.6)],
            vec![CategoryColumn {
                label: "panadería".to_string(),
                metric: Metric::DistanceMeters,
                results: vec![found(3, 120.5)],
            }],
        );
        let rendered = t.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[1].contains("panadería_distance_m"));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }
}
