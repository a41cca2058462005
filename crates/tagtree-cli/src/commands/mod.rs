//! CLI command implementations
//!
//! This module contains all Tagtree CLI command implementations.

pub mod config;
pub mod create;
pub mod export;
pub mod import;
pub mod info;
pub mod search;
pub mod settings;
pub mod tags;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tagtree_config::{ConfigLoader, TagtreeConfig};
use tagtree_core::{HierarchyFormat, ImportedHierarchy, Tag, TagDatabaseHandle, TagKey};

use crate::GlobalOptions;

/// Output format shared by listing commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Load configuration: an explicit `--config` file, or global → local
/// merge from the current directory. CLI overrides apply last.
pub fn load_config(global: &GlobalOptions) -> Result<TagtreeConfig> {
    let overrides = global.to_config_overrides();
    let mut loader = ConfigLoader::new();

    let loaded = match global.config {
        Some(ref config_path) => loader.load_file(config_path, Some(&overrides)),
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            loader.load(&cwd, Some(&overrides))
        }
    };

    loaded.map_err(|err| {
        let hint = if err.is_invalid_value() {
            "Invalid configuration (see `tagtree config path`)"
        } else {
            "Failed to load configuration"
        };
        anyhow::Error::new(err).context(hint)
    })
}

/// The database to operate on: `--db`, else `storage.default_database`.
pub fn resolve_database(config: &TagtreeConfig) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    config.default_database(&cwd).ok_or_else(|| {
        anyhow::anyhow!(
            "No database given; pass --db <FILE> or set storage.default_database in the config"
        )
    })
}

/// Open the configured database.
pub async fn open_database(config: &TagtreeConfig) -> Result<TagDatabaseHandle> {
    let path = resolve_database(config)?;
    let handle = TagDatabaseHandle::new(config.store_config());
    handle
        .load(&path)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    Ok(handle)
}

/// Parse a hierarchy template, picking the codec from the file extension.
pub fn read_template(path: &Path) -> Result<ImportedHierarchy> {
    let format = HierarchyFormat::from_path(path).ok_or_else(|| {
        anyhow::anyhow!(
            "Unsupported template format: {} (expected .{})",
            path.display(),
            HierarchyFormat::MusicBeeTemplate.extension()
        )
    })?;

    format
        .importer()
        .import_file(path)
        .with_context(|| format!("Failed to import {}", path.display()))
}

/// Interpret user input as a tag name, or as an id when no tag has that name.
pub fn resolve_key(handle: &TagDatabaseHandle, input: &str) -> TagKey {
    if handle.tag(input).is_none() {
        if let Ok(id) = input.parse::<i64>() {
            return TagKey::Id(id);
        }
    }
    TagKey::from(input)
}

/// Look up a tag or fail with a readable message.
pub fn require_tag(handle: &TagDatabaseHandle, input: &str) -> Result<Tag> {
    let key = resolve_key(handle, input);
    handle
        .tag(key.clone())
        .ok_or_else(|| anyhow::anyhow!("Tag {} not found", key))
}

/// One-line description of a tag.
pub fn describe_tag(tag: &Tag) -> String {
    let mut line = format!("{} (#{})", tag.name, tag.id);
    if tag.is_top_level {
        line.push_str(" [top level]");
    }
    if !tag.parent_names.is_empty() {
        let parents: Vec<&str> = tag.parent_names.iter().map(String::as_str).collect();
        line.push_str(&format!(" <- {}", parents.join(", ")));
    }
    line
}

/// Print tags as text lines or a JSON array.
pub fn print_tags(tags: &[Tag], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(tags).context("Failed to serialize tags")?
            );
        }
        OutputFormat::Text => {
            for tag in tags {
                println!("{}", describe_tag(tag));
            }
        }
    }
    Ok(())
}

/// Sort tags by case-insensitive name.
pub fn sort_tags(tags: &mut [Tag]) {
    tags.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
