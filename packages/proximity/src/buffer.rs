//! Circular search buffers in degree space.
//!
//! The buffer is a regular polygon with [`SEGMENTS_PER_QUADRANT`] edges per
//! quarter circle. Every vertex lies on the true circle, so buffers of
//! different radii around the same centre are nested and counts never
//! decrease as the radius grows.

use std::f64::consts::FRAC_PI_2;

use denue_radius_registry_models::{Coordinate, Establishment};
use geo::{Intersects, LineString, Point, Polygon};

/// Edges per quarter circle.
pub const SEGMENTS_PER_QUADRANT: usize = 16;

/// Builds the buffer polygon of `radius_degrees` around `center`.
#[must_use]
pub fn circle(center: Coordinate, radius_degrees: f64) -> Polygon<f64> {
    let segments = SEGMENTS_PER_QUADRANT * 4;
    #[allow(clippy::cast_precision_loss)]
    let step = FRAC_PI_2 / SEGMENTS_PER_QUADRANT as f64;

    let ring: Vec<(f64, f64)> = (0..=segments)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = step * (i % segments) as f64;
            (
                radius_degrees.mul_add(angle.cos(), center.longitude),
                radius_degrees.mul_add(angle.sin(), center.latitude),
            )
        })
        .collect();

    Polygon::new(LineString::from(ring), vec![])
}

/// Whether the establishment's geometry touches or lies inside `buffer`.
#[must_use]
pub fn contains(buffer: &Polygon<f64>, establishment: &Establishment) -> bool {
    let point = Point::new(
        establishment.geometry.longitude,
        establishment.geometry.latitude,
    );
    buffer.intersects(&point)
}

/// Number of `candidates` inside the buffer of `radius_degrees` around
/// `center`.
///
/// A zero radius has no area, so it counts establishments located exactly
/// at `center`.
#[must_use]
pub fn count_within(center: Coordinate, radius_degrees: f64, candidates: &[&Establishment]) -> usize {
    if radius_degrees <= 0.0 {
        return candidates.iter().filter(|e| e.geometry == center).count();
    }

    let buffer = circle(center, radius_degrees);
    candidates.iter().filter(|e| contains(&buffer, e)).count()
}
