//! Attribute column names used to build [`Establishment`]s.
//!
//! [`Establishment`]: denue_radius_registry_models::Establishment

use serde::Deserialize;

/// Names of the registry columns holding each establishment attribute.
///
/// Defaults match the DENUE distribution (`codigo_act`, `nom_estab`,
/// `latitud`, `longitud`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldMapping {
    /// Activity code column.
    pub code: String,
    /// Establishment name column.
    pub name: String,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            code: "codigo_act".to_string(),
            name: "nom_estab".to_string(),
            latitude: "latitud".to_string(),
            longitude: "longitud".to_string(),
        }
    }
}

/// Renders a numeric attribute as a code string, dropping a zero
/// fractional part (`462111.0` becomes `"462111"`).
#[must_use]
pub fn numeric_code(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
