//! `denue_radius.toml` configuration.
//!
//! ```toml
//! default_registry = "yucatan"
//!
//! [registries]
//! yucatan = "data/denue_31_shp/denue_inegi_31_.shp"
//!
//! [fields]
//! code = "codigo_act"
//!
//! [routing]
//! timeout_secs = 30
//!
//! [search]
//! radius_m = 1000.0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use denue_radius_proximity::MetricScale;
use denue_radius_proximity::scale::DEGREES_PER_METER;
use denue_radius_proximity::search::DEFAULT_RADIUS_M;
use denue_radius_registry::FieldMapping;
use denue_radius_routing::distance_matrix::RoutingConfig;
use serde::Deserialize;
use thiserror::Error;

/// File read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "denue_radius.toml";

/// Environment variable that overrides `[routing] api_key`.
pub const API_KEY_ENV: &str = "DENUE_RADIUS_ROUTING_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No registry given and no default_registry configured")]
    NoRegistry,

    #[error("Registry '{name}' is not configured")]
    UnknownRegistry { name: String },

    #[error("Driving mode needs an API key ([routing] api_key or {})", API_KEY_ENV)]
    MissingApiKey,

    #[error("Invalid degrees_per_meter: {value}")]
    InvalidScale { value: f64 },
}

/// Search defaults from the `[search]` table.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub radius_m: f64,
    pub degrees_per_meter: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            degrees_per_meter: DEGREES_PER_METER,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Registry layers by short name.
    pub registries: BTreeMap<String, PathBuf>,
    pub default_registry: Option<String>,
    pub fields: FieldMapping,
    pub routing: RoutingConfig,
    pub search: SearchConfig,
}

impl Config {
    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, or defaults.
    /// The API key environment variable is applied last.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given file cannot be read
    /// or any file fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::read(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                log::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                Self::default()
            }
        };

        Ok(config.with_api_key_override(std::env::var(API_KEY_ENV).ok()))
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Self::parse(&text)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML for
    /// this schema.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    #[must_use]
    pub fn with_api_key_override(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.routing.api_key = Some(key);
        }
        self
    }

    /// Resolves `--registry`: a configured name, otherwise a path.
    /// Without an argument the default registry is used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if nothing is given and there is no usable
    /// default.
    pub fn registry_path(&self, registry: Option<&str>) -> Result<PathBuf, ConfigError> {
        match registry {
            Some(name) => Ok(self
                .registries
                .get(name)
                .cloned()
                .unwrap_or_else(|| PathBuf::from(name))),
            None => {
                let name = self
                    .default_registry
                    .as_deref()
                    .ok_or(ConfigError::NoRegistry)?;
                self.registries
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownRegistry {
                        name: name.to_string(),
                    })
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if no key is configured.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.routing
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidScale`] for a non-positive factor.
    pub fn scale(&self) -> Result<MetricScale, ConfigError> {
        MetricScale::new(self.search.degrees_per_meter).ok_or(ConfigError::InvalidScale {
            value: self.search.degrees_per_meter,
        })
    }
}
