//! Configuration error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use tagtree_core::model::LIST_SEPARATOR;
use tagtree_core::store::schema::DATABASE_EXTENSION;

use crate::LOG_LEVELS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Writing the file or creating its directory failed.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("logging.level: unknown level '{level}', expected one of {}", LOG_LEVELS.join(", "))]
    UnknownLogLevel { level: String },

    #[error("tags.default_bindings: entries cannot be empty")]
    EmptyBinding,

    #[error("tags.default_bindings: '{binding}' contains the list separator '{}'", LIST_SEPARATOR)]
    BindingHasSeparator { binding: String },

    #[error("storage.default_database: '{path}' must have the .{} extension", DATABASE_EXTENSION)]
    DatabaseExtension { path: PathBuf },
}

impl ConfigError {
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Whether the configuration was readable but holds a bad value.
    pub fn is_invalid_value(&self) -> bool {
        matches!(
            self,
            Self::UnknownLogLevel { .. }
                | Self::EmptyBinding
                | Self::BindingHasSeparator { .. }
                | Self::DatabaseExtension { .. }
        )
    }
}
