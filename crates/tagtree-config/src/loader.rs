//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.tagtree/config.toml`
//! 2. Local config: `.tagtree/config.toml` (in the working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones. A field left at its default in a
//! later source keeps the earlier value.

use crate::error::ConfigError;
use crate::{ConfigOverrides, LoggingConfig, SearchConfig, StorageConfig, TagsConfig, TagtreeConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".tagtree";

/// Local configuration directory name.
const LOCAL_CONFIG_DIR: &str = ".tagtree";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.tagtree`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<TagtreeConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.tagtree`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a directory with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<TagtreeConfig, ConfigError> {
        let mut config = TagtreeConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load one explicit file in place of the global/local pair, then
    /// apply overrides.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<TagtreeConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(TagtreeConfig::default(), load_config_file(path)?);

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<TagtreeConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration under `root`.
    pub fn load_local(&self, root: &Path) -> Result<Option<TagtreeConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    pub fn save_global(&self, config: &TagtreeConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    pub fn save_local(&self, root: &Path, config: &TagtreeConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Initialize global configuration directory.
    ///
    /// Creates `~/.tagtree/config.toml` with default configuration. An
    /// existing file is left alone.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        init_config_dir(global_dir)
    }

    /// Initialize local configuration under `root`.
    ///
    /// Creates `.tagtree/config.toml` with default configuration. An
    /// existing file is left alone.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&root.join(LOCAL_CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::write(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &TagtreeConfig::default())?;
    }

    Ok(config_path)
}

/// Load a configuration file from disk.
pub fn load_config_file(path: &Path) -> Result<TagtreeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse(path, e))
}

/// Save a configuration file to disk, creating its directory.
pub fn save_config_file(path: &Path, config: &TagtreeConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::write(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))
}

/// Merge two configurations, with `overlay` taking precedence.
fn merge_configs(base: TagtreeConfig, overlay: TagtreeConfig) -> TagtreeConfig {
    TagtreeConfig {
        storage: merge_storage(base.storage, overlay.storage),
        tags: merge_tags(base.tags, overlay.tags),
        search: merge_search(base.search, overlay.search),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

/// Pick `overlay` when it differs from the default, otherwise `base`.
fn prefer<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

fn merge_storage(base: StorageConfig, overlay: StorageConfig) -> StorageConfig {
    let default = StorageConfig::default();
    StorageConfig {
        default_database: overlay.default_database.or(base.default_database),
        journal_mode: prefer(base.journal_mode, overlay.journal_mode, default.journal_mode),
        foreign_keys: prefer(base.foreign_keys, overlay.foreign_keys, default.foreign_keys),
    }
}

fn merge_tags(base: TagsConfig, overlay: TagsConfig) -> TagsConfig {
    TagsConfig {
        default_bindings: prefer(
            base.default_bindings,
            overlay.default_bindings,
            TagsConfig::default().default_bindings,
        ),
    }
}

fn merge_search(base: SearchConfig, overlay: SearchConfig) -> SearchConfig {
    let default = SearchConfig::default();
    SearchConfig {
        mode: prefer(base.mode, overlay.mode, default.mode),
        include_aliases: prefer(
            base.include_aliases,
            overlay.include_aliases,
            default.include_aliases,
        ),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let default = LoggingConfig::default();
    LoggingConfig {
        level: prefer(base.level, overlay.level, default.level),
        format: prefer(base.format, overlay.format, default.format),
    }
}
