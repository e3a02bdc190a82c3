//! The proximity search: radius count plus nearest candidate.
//!
//! For each query point and category:
//!
//! 1. Count candidates inside the circular buffer of `radius_m`.
//! 2. Rank *all* candidates by linear distance, not only those in the
//!    buffer.
//! 3. Report the nearest one, either by linear distance or, in driving
//!    mode, by travel time to the [`MAX_MATRIX_ELEMENTS`] linearly nearest
//!    candidates.
//!
//! A category without candidates yields a zero count and no nearest value.

use std::sync::Arc;

use denue_radius_registry::{Registry, coerce};
use denue_radius_registry_models::{Category, Coordinate, Establishment, QueryPoint};
use denue_radius_routing::{MAX_MATRIX_ELEMENTS, TravelTimeProvider};
use serde::Serialize;

use crate::progress::ProgressCallback;
use crate::scale::{self, MetricScale};
use crate::table::{CategoryColumn, FeatureTable, Metric};
use crate::{ProximityError, buffer};

/// Default search radius in meters.
pub const DEFAULT_RADIUS_M: f64 = 2000.0;

/// How the nearest candidate is measured.
#[derive(Clone, Copy)]
pub enum DistanceMode<'a> {
    /// Straight-line distance in meters, rounded to centimetres.
    Linear,
    /// Travel time in minutes from a routing service.
    Driving(&'a dyn TravelTimeProvider),
}

impl DistanceMode<'_> {
    /// The quantity this mode reports.
    #[must_use]
    pub const fn metric(&self) -> Metric {
        match self {
            Self::Linear => Metric::DistanceMeters,
            Self::Driving(_) => Metric::DurationMinutes,
        }
    }
}

impl std::fmt::Debug for DistanceMode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => f.write_str("Linear"),
            Self::Driving(_) => f.write_str("Driving"),
        }
    }
}

/// Radius and scale shared by every point of a batch.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Buffer radius in meters.
    pub radius_m: f64,
    /// Meters-to-degrees conversion.
    pub scale: MetricScale,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            scale: MetricScale::default(),
        }
    }
}

impl SearchOptions {
    /// Creates options for `radius_m` with the default scale.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::InvalidRadius`] if the radius is negative
    /// or not finite.
    pub fn with_radius(radius_m: f64) -> Result<Self, ProximityError> {
        let options = Self {
            radius_m,
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ProximityError> {
        if self.radius_m.is_finite() && self.radius_m >= 0.0 {
            Ok(())
        } else {
            Err(ProximityError::InvalidRadius {
                radius_m: self.radius_m,
            })
        }
    }
}

/// The candidate that produced the reported minimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nearest {
    /// Distance in meters or duration in minutes.
    pub value: f64,
    /// Activity code of the candidate.
    pub code: String,
    /// Name of the candidate.
    pub name: String,
    /// Location of the candidate.
    pub coordinate: Coordinate,
}

/// Outcome for one query point and one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult {
    /// Candidates inside the buffer.
    pub count: usize,
    /// Nearest candidate, `None` when the category has no candidates.
    pub nearest: Option<Nearest>,
}

impl ProximityResult {
    /// The result for a category with no candidates.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            count: 0,
            nearest: None,
        }
    }

    /// The reported minimum distance/duration, if any.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.nearest.as_ref().map(|n| n.value)
    }
}

fn round_centimetres(meters: f64) -> f64 {
    (meters * 100.0).round() / 100.0
}

fn nearest_from(establishment: &Establishment, value: f64) -> Nearest {
    Nearest {
        value,
        code: establishment.code.clone(),
        name: establishment.name.clone(),
        coordinate: establishment.geometry,
    }
}

/// Searches one category around one point.
///
/// # Errors
///
/// Returns [`ProximityError`] if the radius is invalid or, in driving
/// mode, the routing lookup fails.
pub async fn search_point(
    origin: Coordinate,
    candidates: &[&Establishment],
    options: &SearchOptions,
    mode: DistanceMode<'_>,
) -> Result<ProximityResult, ProximityError> {
    options.validate()?;

    if candidates.is_empty() {
        return Ok(ProximityResult::empty());
    }

    let count = buffer::count_within(
        origin,
        options.scale.to_degrees(options.radius_m),
        candidates,
    );

    let mut ranked: Vec<(f64, &Establishment)> = candidates
        .iter()
        .map(|e| (options.scale.linear_distance(origin, e.geometry), *e))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let nearest = match mode {
        DistanceMode::Linear => {
            let (distance, establishment) = ranked[0];
            nearest_from(establishment, round_centimetres(distance))
        }
        DistanceMode::Driving(provider) => {
            ranked.truncate(MAX_MATRIX_ELEMENTS);
            let destinations: Vec<Coordinate> =
                ranked.iter().map(|(_, e)| e.destination()).collect();

            let durations = provider.durations(origin, &destinations).await?;
            if durations.len() != ranked.len() {
                return Err(ProximityError::RoutingMismatch {
                    expected: ranked.len(),
                    actual: durations.len(),
                });
            }

            let (idx, minutes) = durations
                .iter()
                .copied()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .ok_or(ProximityError::RoutingMismatch {
                    expected: ranked.len(),
                    actual: 0,
                })?;
            nearest_from(ranked[idx].1, minutes)
        }
    };

    Ok(ProximityResult {
        count,
        nearest: Some(nearest),
    })
}

/// Searches every category around every point.
///
/// Categories are processed in order, and for each category every point
/// in order, one at a time. Results line up positionally with `points`.
///
/// # Errors
///
/// Returns [`ProximityError`] for an invalid radius or query coordinate,
/// or the first routing failure. No partial table is returned.
pub async fn search_batch(
    registry: &Registry,
    categories: &[Category],
    points: &[QueryPoint],
    options: &SearchOptions,
    mode: DistanceMode<'_>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<FeatureTable, ProximityError> {
    options.validate()?;

    for (index, point) in points.iter().enumerate() {
        coerce::validate(point.coordinate)
            .map_err(|source| ProximityError::InvalidQuery { index, source })?;
    }

    let uncalibrated = points
        .iter()
        .filter(|p| !scale::is_calibrated(p.coordinate))
        .count();
    if uncalibrated > 0 {
        log::warn!(
            "{uncalibrated} of {} query points lie outside the calibrated latitude band {:?}; \
             radius and linear distances are approximate there",
            points.len(),
            scale::CALIBRATED_LATITUDES
        );
    }

    progress.set_total(u64::try_from(categories.len() * points.len()).unwrap_or(u64::MAX));

    let metric = mode.metric();
    let mut columns = Vec::with_capacity(categories.len());

    for category in categories {
        progress.set_message(category.label.clone());
        let candidates = registry.candidates(category);
        log::info!(
            "Category '{}': {} candidate establishments",
            category.label,
            candidates.len()
        );

        let mut results = Vec::with_capacity(points.len());
        for point in points {
            let result = search_point(point.coordinate, &candidates, options, mode).await?;
            log::debug!(
                "{} at {}: count={} nearest={:?}",
                category.label,
                point.coordinate.to_lat_lon_string(),
                result.count,
                result.value()
            );
            results.push(result);
            progress.inc(1);
        }

        columns.push(CategoryColumn {
            label: category.label.clone(),
            metric,
            results,
        });
    }

    progress.finish(format!(
        "Searched {} categories around {} points",
        categories.len(),
        points.len()
    ));

    Ok(FeatureTable::new(points.to_vec(), columns))
}
