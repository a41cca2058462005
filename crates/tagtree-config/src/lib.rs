//! Tagtree Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.tagtree/config.toml`
//! - Local config: `.tagtree/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → CLI overrides.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{load_config_file, save_config_file, ConfigLoader};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tagtree_core::model::LIST_SEPARATOR;
use tagtree_core::store::schema::{DATABASE_EXTENSION, IN_MEMORY_PATH};
use tagtree_core::{JournalMode, SearchMode, StoreConfig};

/// Root configuration for Tagtree.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TagtreeConfig {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Tag defaults for new databases
    pub tags: TagsConfig,

    /// Search defaults
    pub search: SearchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration for hierarchy databases.
///
/// # Example TOML
///
/// ```toml
/// [storage]
/// default_database = "music/genres.thdb"
/// journal_mode = "wal"
/// foreign_keys = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Database used when a command is not given one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_database: Option<PathBuf>,

    /// SQLite journal mode
    pub journal_mode: JournalMode,

    /// Enforce foreign keys on parent links
    pub foreign_keys: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_database: None,
            journal_mode: JournalMode::default(),
            foreign_keys: true,
        }
    }
}

/// Tag defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TagsConfig {
    /// Seed for a new database's `default_tag_bind` setting
    pub default_bindings: Vec<String>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            default_bindings: StoreConfig::default().default_bindings,
        }
    }
}

/// Search defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub mode: SearchMode,

    /// Match aliases as well as names
    pub include_aliases: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            include_aliases: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

pub(crate) const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override the default database
    pub database: Option<PathBuf>,

    /// Override the journal mode
    pub journal_mode: Option<JournalMode>,

    /// Override log level
    pub log_level: Option<String>,
}

impl TagtreeConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref database) = overrides.database {
            self.storage.default_database = Some(database.clone());
        }

        if let Some(mode) = overrides.journal_mode {
            self.storage.journal_mode = mode;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::UnknownLogLevel {
                level: self.logging.level.clone(),
            });
        }

        for binding in &self.tags.default_bindings {
            if binding.trim().is_empty() {
                return Err(ConfigError::EmptyBinding);
            }
            if binding.contains(LIST_SEPARATOR) {
                return Err(ConfigError::BindingHasSeparator {
                    binding: binding.clone(),
                });
            }
        }

        if let Some(ref path) = self.storage.default_database {
            if path.as_os_str() != IN_MEMORY_PATH
                && path.extension().and_then(|e| e.to_str()) != Some(DATABASE_EXTENSION)
            {
                return Err(ConfigError::DatabaseExtension { path: path.clone() });
            }
        }
        Ok(())
    }

    /// Store options for opening a database with this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            default_bindings: self.tags.default_bindings.clone(),
            journal_mode: self.storage.journal_mode,
            foreign_keys: self.storage.foreign_keys,
        }
    }

    /// The configured default database, resolved against `base` when relative.
    pub fn default_database(&self, base: &Path) -> Option<PathBuf> {
        self.storage.default_database.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                base.join(path)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TagtreeConfig::default();
        assert_eq!(config.storage.default_database, None);
        assert_eq!(config.storage.journal_mode, JournalMode::Delete);
        assert!(config.storage.foreign_keys);
        assert_eq!(config.tags.default_bindings, vec!["genre"]);
        assert_eq!(config.search.mode, SearchMode::Fuzzy);
        assert!(config.search.include_aliases);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = TagtreeConfig::default();
        let overrides = ConfigOverrides {
            database: Some(PathBuf::from("/music/genres.thdb")),
            journal_mode: Some(JournalMode::Wal),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        config.apply_overrides(&overrides);

        assert_eq!(
            config.storage.default_database,
            Some(PathBuf::from("/music/genres.thdb"))
        );
        assert_eq!(config.storage.journal_mode, JournalMode::Wal);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.search.mode, SearchMode::Fuzzy);
    }

    #[test]
    fn test_store_config_conversion() {
        let mut config = TagtreeConfig::default();
        config.tags.default_bindings = vec!["genre".to_string(), "mood".to_string()];
        config.storage.journal_mode = JournalMode::Wal;

        let store = config.store_config();
        assert_eq!(store.default_bindings, vec!["genre", "mood"]);
        assert_eq!(store.journal_mode, JournalMode::Wal);
        assert!(store.foreign_keys);
    }

    #[test]
    fn test_default_database_resolution() {
        let mut config = TagtreeConfig::default();
        let base = PathBuf::from("/home/user");
        assert_eq!(config.default_database(&base), None);

        config.storage.default_database = Some(PathBuf::from("music/genres.thdb"));
        assert_eq!(
            config.default_database(&base),
            Some(PathBuf::from("/home/user/music/genres.thdb"))
        );

        config.storage.default_database = Some(PathBuf::from("/srv/genres.thdb"));
        assert_eq!(
            config.default_database(&base),
            Some(PathBuf::from("/srv/genres.thdb"))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = TagtreeConfig::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownLogLevel { ref level }) if level == "loud"
        ));

        let mut config = TagtreeConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        let mut config = TagtreeConfig::default();
        config.tags.default_bindings = vec!["genre;style".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BindingHasSeparator { ref binding }) if binding == "genre;style"
        ));

        let mut config = TagtreeConfig::default();
        config.tags.default_bindings = vec!["  ".to_string()];
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBinding)));

        let mut config = TagtreeConfig::default();
        config.storage.default_database = Some(PathBuf::from("music/genres.db"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DatabaseExtension { .. })
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let parsed: TagtreeConfig = toml::from_str(
            r#"
            [storage]
            journal_mode = "wal"

            [search]
            mode = "ends-with"
            include_aliases = false

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.storage.journal_mode, JournalMode::Wal);
        assert_eq!(parsed.search.mode, SearchMode::EndsWith);
        assert!(!parsed.search.include_aliases);
        assert_eq!(parsed.logging.format, LogFormat::Json);
        assert_eq!(parsed.tags.default_bindings, vec!["genre"]);

        let written = toml::to_string_pretty(&parsed).unwrap();
        let reparsed: TagtreeConfig = toml::from_str(&written).unwrap();
        assert_eq!(reparsed, parsed);
    }
}
