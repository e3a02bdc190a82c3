//! Conversion between meters and geographic degrees.
//!
//! Distances are measured in raw lon/lat degree space and converted with
//! one empirical constant: 0.005° ≈ 550 m. The constant was calibrated in
//! Mérida, Yucatán and is only trusted across the latitude band of
//! central and southern Mexico. Outside [`CALIBRATED_LATITUDES`] the
//! result is still computed, but callers should not rely on it.

use std::ops::RangeInclusive;

use denue_radius_registry_models::Coordinate;

/// Degrees per meter: 0.005° for every 550 m.
pub const DEGREES_PER_METER: f64 = 0.005 / 550.0;

/// Latitudes (°N) over which [`DEGREES_PER_METER`] was checked.
pub const CALIBRATED_LATITUDES: RangeInclusive<f64> = 14.0..=33.0;

/// A meters-to-degrees scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricScale {
    degrees_per_meter: f64,
}

impl Default for MetricScale {
    fn default() -> Self {
        Self {
            degrees_per_meter: DEGREES_PER_METER,
        }
    }
}

impl MetricScale {
    /// Creates a scale, returning `None` unless `degrees_per_meter` is
    /// finite and positive.
    #[must_use]
    pub fn new(degrees_per_meter: f64) -> Option<Self> {
        (degrees_per_meter.is_finite() && degrees_per_meter > 0.0)
            .then_some(Self { degrees_per_meter })
    }

    #[must_use]
    pub const fn degrees_per_meter(&self) -> f64 {
        self.degrees_per_meter
    }

    #[must_use]
    pub fn to_degrees(&self, meters: f64) -> f64 {
        meters * self.degrees_per_meter
    }

    #[must_use]
    pub fn to_meters(&self, degrees: f64) -> f64 {
        degrees / self.degrees_per_meter
    }

    /// Straight-line distance in degree space, expressed in meters.
    #[must_use]
    pub fn linear_distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        self.to_meters((a.longitude - b.longitude).hypot(a.latitude - b.latitude))
    }
}

/// Whether `coordinate` falls inside the calibrated latitude band.
#[must_use]
pub fn is_calibrated(coordinate: Coordinate) -> bool {
    CALIBRATED_LATITUDES.contains(&coordinate.latitude)
}
