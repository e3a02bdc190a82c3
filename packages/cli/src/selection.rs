//! Turns `search` arguments into categories and query points.

use std::path::Path;

use denue_radius_registry::coerce;
use denue_radius_registry_models::{CategorySelector, QueryPoint};
use denue_radius_sampling::points;

/// Builds a selector from `--code CODE[=LABEL]` or `--keyword` values.
///
/// # Errors
///
/// Returns an error if both or neither kinds are given, or a code is
/// empty.
pub fn selector(
    codes: &[String],
    keywords: &[String],
) -> Result<CategorySelector, Box<dyn std::error::Error>> {
    match (codes.is_empty(), keywords.is_empty()) {
        (false, true) => {
            let pairs = codes
                .iter()
                .map(|arg| parse_code(arg))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CategorySelector::Codes { codes: pairs })
        }
        (true, false) => Ok(CategorySelector::Keywords {
            keywords: keywords.to_vec(),
        }),
        (false, false) => Err("--code and --keyword cannot be combined".into()),
        (true, true) => Err("at least one --code or --keyword is required".into()),
    }
}

/// Splits `CODE=LABEL`; a bare code is its own label.
fn parse_code(arg: &str) -> Result<(String, String), String> {
    let (code, label) = arg.split_once('=').unwrap_or((arg, arg));
    let (code, label) = (code.trim(), label.trim());
    if code.is_empty() {
        return Err(format!("empty activity code in '{arg}'"));
    }
    let label = if label.is_empty() { code } else { label };
    Ok((code.to_string(), label.to_string()))
}

/// Collects query points from `--point LAT,LON` values and an optional
/// CSV file, in that order.
///
/// # Errors
///
/// Returns an error if a point does not parse, the file cannot be read, or
/// no points are given at all.
pub fn query_points(
    args: &[String],
    csv_path: Option<&Path>,
) -> Result<Vec<QueryPoint>, Box<dyn std::error::Error>> {
    let mut result = args
        .iter()
        .map(|arg| {
            coerce::parse_lat_lon(arg).map(|coordinate| QueryPoint {
                id: None,
                coordinate,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(path) = csv_path {
        let file = std::fs::File::open(path)?;
        result.extend(points::read_points_csv(std::io::BufReader::new(file))?);
    }

    if result.is_empty() {
        return Err("at least one --point or --points-csv is required".into());
    }
    Ok(result)
}
