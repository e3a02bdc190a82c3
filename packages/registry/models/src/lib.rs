#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Registry establishment, query point and category types.
//!
//! These types describe the candidate pool (establishments from the DENUE
//! business registry), the points being scored, and the category
//! selectors that decide which establishments count for each feature
//! column. They carry no I/O and are shared by every other crate.

use serde::{Deserialize, Serialize};

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Formats as `"lat,lon"`, the order routing services expect.
    #[must_use]
    pub fn to_lat_lon_string(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// A point to be scored, optionally keyed by an external identifier
/// (e.g. a census block `CVEGEO`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPoint {
    /// Identifier carried through to the output table.
    pub id: Option<String>,
    /// Location of the point.
    pub coordinate: Coordinate,
}

impl QueryPoint {
    /// Creates an anonymous query point.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            id: None,
            coordinate: Coordinate::new(latitude, longitude),
        }
    }

    /// Creates a query point carrying an identifier.
    #[must_use]
    pub fn with_id(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: Some(id.into()),
            coordinate: Coordinate::new(latitude, longitude),
        }
    }
}

/// A single economic establishment from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Establishment {
    /// Six-digit SCIAN activity code (e.g. `"462111"` for supermarkets).
    pub code: String,
    /// Establishment display name as registered (usually upper-case).
    pub name: String,
    /// Point geometry used for buffer containment and linear distance.
    pub geometry: Coordinate,
    /// Latitude attribute as published by the registry.
    pub latitude: f64,
    /// Longitude attribute as published by the registry.
    pub longitude: f64,
}

impl Establishment {
    /// The coordinate sent to routing services as a destination.
    #[must_use]
    pub const fn destination(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// How an establishment is matched against a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CategoryMatcher {
    /// Exact activity code match.
    Code(String),
    /// Upper-cased substring of the establishment name.
    Keyword(String),
}

impl CategoryMatcher {
    /// Builds a code matcher, trimming surrounding whitespace.
    #[must_use]
    pub fn code(code: &str) -> Self {
        Self::Code(code.trim().to_string())
    }

    /// Builds a keyword matcher. Keywords are trimmed and upper-cased.
    #[must_use]
    pub fn keyword(keyword: &str) -> Self {
        Self::Keyword(keyword.trim().to_uppercase())
    }

    /// Whether `establishment` belongs to this category.
    #[must_use]
    pub fn matches(&self, establishment: &Establishment) -> bool {
        match self {
            Self::Code(code) => establishment.code == *code,
            Self::Keyword(keyword) => establishment.name.to_uppercase().contains(keyword.as_str()),
        }
    }
}

/// A labelled category: one pair of output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Column prefix in the output table (e.g. `"supermercado"`).
    pub label: String,
    /// Which establishments belong to the category.
    pub matcher: CategoryMatcher,
}

/// Which categories a search should produce columns for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CategorySelector {
    /// Ordered `(code, label)` pairs.
    Codes {
        /// Activity code and its column label.
        codes: Vec<(String, String)>,
    },
    /// Plain list of activity codes; each code is its own label.
    CodeList {
        /// Activity codes.
        codes: Vec<String>,
    },
    /// Name substrings; each trimmed keyword is its own label.
    Keywords {
        /// Keywords matched against the establishment name.
        keywords: Vec<String>,
    },
}

impl CategorySelector {
    /// Expands the selector into labelled categories, preserving order.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        match self {
            Self::Codes { codes } => codes
                .iter()
                .map(|(code, label)| Category {
                    label: label.clone(),
                    matcher: CategoryMatcher::code(code),
                })
                .collect(),
            Self::CodeList { codes } => codes
                .iter()
                .map(|code| Category {
                    label: code.trim().to_string(),
                    matcher: CategoryMatcher::code(code),
                })
                .collect(),
            Self::Keywords { keywords } => keywords
                .iter()
                .map(|keyword| Category {
                    label: keyword.trim().to_string(),
                    matcher: CategoryMatcher::keyword(keyword),
                })
                .collect(),
        }
    }
}
