//! Seeded sampling of polygon centroids.

use denue_radius_registry_models::QueryPoint;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::layer::PolygonFeature;

/// Seed used when none is given, so repeated runs draw the same blocks.
pub const DEFAULT_SEED: u64 = 12345;

/// Draws up to `count` features without replacement.
///
/// Asking for more features than exist returns all of them, in sampled
/// order.
#[must_use]
pub fn sample(features: &[PolygonFeature], count: usize, seed: u64) -> Vec<&PolygonFeature> {
    let amount = count.min(features.len());
    if amount < count {
        log::warn!(
            "Requested {count} samples but only {} features are available",
            features.len()
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, features.len(), amount)
        .into_iter()
        .map(|idx| &features[idx])
        .collect()
}

/// Converts features to query points at their centroids, keyed by
/// `id_field`. Features with empty geometry are skipped.
#[must_use]
pub fn centroids(features: &[&PolygonFeature], id_field: &str) -> Vec<QueryPoint> {
    features
        .iter()
        .filter_map(|feature| {
            let Some(centroid) = feature.centroid() else {
                log::debug!("Skipping feature without centroid");
                return None;
            };
            Some(QueryPoint {
                id: feature.attribute(id_field).map(String::from),
                coordinate: denue_radius_registry_models::Coordinate::new(
                    centroid.y(),
                    centroid.x(),
                ),
            })
        })
        .collect()
}
