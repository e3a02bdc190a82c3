//! Coercion of textual coordinates into validated [`Coordinate`]s.

use denue_radius_registry_models::Coordinate;

use crate::RegistryError;

/// Parses a single coordinate component, trimming whitespace.
///
/// # Errors
///
/// Returns [`RegistryError::Coordinate`] if the text is not a finite number.
pub fn coerce_component(text: &str) -> Result<f64, RegistryError> {
    let value = text
        .trim()
        .parse::<f64>()
        .map_err(|e| RegistryError::Coordinate {
            message: format!("'{text}' is not a number: {e}"),
        })?;

    if !value.is_finite() {
        return Err(RegistryError::Coordinate {
            message: format!("'{text}' is not finite"),
        });
    }

    Ok(value)
}

/// Checks that a coordinate lies within geographic bounds.
///
/// # Errors
///
/// Returns [`RegistryError::Coordinate`] if the latitude is outside ±90 or
/// the longitude outside ±180.
pub fn validate(coordinate: Coordinate) -> Result<Coordinate, RegistryError> {
    if !coordinate.latitude.is_finite() || coordinate.latitude.abs() > 90.0 {
        return Err(RegistryError::Coordinate {
            message: format!("latitude {} out of range", coordinate.latitude),
        });
    }
    if !coordinate.longitude.is_finite() || coordinate.longitude.abs() > 180.0 {
        return Err(RegistryError::Coordinate {
            message: format!("longitude {} out of range", coordinate.longitude),
        });
    }
    Ok(coordinate)
}

/// Builds a coordinate from separate latitude and longitude strings.
///
/// # Errors
///
/// Returns [`RegistryError::Coordinate`] if either part fails to coerce.
pub fn coerce_pair(latitude: &str, longitude: &str) -> Result<Coordinate, RegistryError> {
    validate(Coordinate::new(
        coerce_component(latitude)?,
        coerce_component(longitude)?,
    ))
}

/// Parses `"lat,lon"`.
///
/// # Errors
///
/// Returns [`RegistryError::Coordinate`] if the text is not two
/// comma-separated numbers.
pub fn parse_lat_lon(text: &str) -> Result<Coordinate, RegistryError> {
    let Some((lat, lon)) = text.split_once(',') else {
        return Err(RegistryError::Coordinate {
            message: format!("'{text}' is not a \"lat,lon\" pair"),
        });
    };
    coerce_pair(lat, lon)
}
