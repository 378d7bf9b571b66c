//! Connection and import settings. Command-line flags and environment
//! variables form one layer, an optional YAML file another; the first layer
//! that sets a value wins and built-in defaults fill the rest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::schema::PrimaryLanguage;
use crate::data::timestamp::TimestampPolicy;

pub const DEFAULT_CONNECTION_STRING: &str = "mongodb://localhost:27017/ai-news";
pub const DEFAULT_COLLECTION: &str = "news";
pub const DEFAULT_IMPORT_PATH: &str = "database_import/news_data.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{}': {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("connection string must not be empty")]
    EmptyConnectionString,

    #[error("invalid collection name '{name}': {reason}")]
    InvalidCollection { name: String, reason: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub connection_string: Option<String>,
    pub collection: Option<String>,
    pub database: Option<String>,
    pub default_import_path: Option<PathBuf>,
    pub primary_language: Option<PrimaryLanguage>,
    pub strict_timestamps: Option<bool>,
}

impl ConfigLayer {
    /// Fills every unset value of `self` from `lower`.
    pub fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            connection_string: self.connection_string.or(lower.connection_string),
            collection: self.collection.or(lower.collection),
            database: self.database.or(lower.database),
            default_import_path: self.default_import_path.or(lower.default_import_path),
            primary_language: self.primary_language.or(lower.primary_language),
            strict_timestamps: self.strict_timestamps.or(lower.strict_timestamps),
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub connection_string: String,
    pub collection: String,
    /// Overrides the database named in the connection string.
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub store: StoreConfig,
    pub default_import_path: PathBuf,
    pub primary_language: PrimaryLanguage,
    pub timestamp_policy: TimestampPolicy,
}

impl LoaderConfig {
    pub fn resolve(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let connection_string = layer
            .connection_string
            .unwrap_or_else(|| DEFAULT_CONNECTION_STRING.to_string())
            .trim()
            .to_string();
        if connection_string.is_empty() {
            return Err(ConfigError::EmptyConnectionString);
        }

        let collection = layer
            .collection
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string())
            .trim()
            .to_string();
        validate_collection_name(&collection)?;

        let database = layer
            .database
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let timestamp_policy = if layer.strict_timestamps.unwrap_or(false) {
            TimestampPolicy::Reject
        } else {
            TimestampPolicy::Substitute
        };

        Ok(Self {
            store: StoreConfig {
                connection_string,
                collection,
                database,
            },
            default_import_path: layer
                .default_import_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMPORT_PATH)),
            primary_language: layer.primary_language.unwrap_or_default(),
            timestamp_policy,
        })
    }
}

fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains('$') {
        Some("must not contain '$'")
    } else if name.contains('\0') {
        Some("must not contain NUL")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidCollection {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
