//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

use super::schema::DATABASE_EXTENSION;
use crate::codec::ImportError;
use crate::model::{TagKey, TagValidationError};

/// Errors that can occur during tag database operations.
#[derive(Error, Debug)]
pub enum TagDatabaseError {
    /// No path was given
    #[error("file path cannot be empty")]
    EmptyPath,

    /// Path does not carry the database extension
    #[error("file extension must be .{}: '{path}'", DATABASE_EXTENSION)]
    InvalidExtension { path: PathBuf },

    /// Nothing to load at the given path
    #[error("no file exists at '{path}'")]
    FileNotFound { path: PathBuf },

    /// Creating over an existing file without asking to overwrite it
    #[error("a file already exists at '{path}'")]
    FileExists { path: PathBuf },

    /// The file is not SQLite at all
    #[error("'{path}' is not a valid SQLite database file")]
    NotSqlite { path: PathBuf },

    /// The file is SQLite but holds something other than a tag hierarchy
    #[error("not a valid tag hierarchy database: unexpected table '{table}'")]
    UnexpectedSchema { table: String },

    /// A required table is absent
    #[error("not a valid tag hierarchy database: missing table '{table}'")]
    MissingTable { table: String },

    /// A stored setting has a value the store cannot use
    #[error("setting '{key}' has an invalid value '{value}'")]
    InvalidSetting { key: String, value: String },

    /// Written by a newer release
    #[error("database version {found} is newer than the latest supported version {latest}")]
    UnsupportedVersion { found: i64, latest: i64 },

    /// Used before `create`/`load`, or after `close`
    #[error("the tag hierarchy database has not been initialised")]
    NotInitialised,

    /// Tag failed its own invariants
    #[error(transparent)]
    Validation(#[from] TagValidationError),

    /// Another tag already has this name
    #[error("tag \"{name}\" already exists in the database")]
    DuplicateName { name: String },

    /// Unknown tag id or name
    #[error("tag {key} does not exist in the database")]
    TagNotFound { key: TagKey },

    /// Delete blocked by existing children
    #[error("tag '{name}' has {count} child tag(s); re-parent or delete them first")]
    TagHasChildren { name: String, count: usize },

    /// The new parent is already a descendant of the tag
    #[error("making '{parent}' a parent of '{name}' would create a cycle")]
    ParentCycle { name: String, parent: String },

    /// Unknown setting key
    #[error("setting '{key}' does not exist")]
    SettingNotFound { key: String },

    /// Setting key taken
    #[error("setting '{key}' already exists")]
    SettingExists { key: String },

    /// Required settings cannot be deleted
    #[error("setting '{key}' is required and cannot be deleted")]
    SettingRequired { key: String },

    /// Template could not be parsed
    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),
}

impl TagDatabaseError {
    pub fn invalid_extension(path: impl Into<PathBuf>) -> Self {
        Self::InvalidExtension { path: path.into() }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file_exists(path: impl Into<PathBuf>) -> Self {
        Self::FileExists { path: path.into() }
    }

    pub fn not_sqlite(path: impl Into<PathBuf>) -> Self {
        Self::NotSqlite { path: path.into() }
    }

    pub fn unexpected_schema(table: impl Into<String>) -> Self {
        Self::UnexpectedSchema {
            table: table.into(),
        }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    pub fn tag_not_found(key: impl Into<TagKey>) -> Self {
        Self::TagNotFound { key: key.into() }
    }

    pub fn setting_not_found(key: impl Into<String>) -> Self {
        Self::SettingNotFound { key: key.into() }
    }

    pub fn setting_exists(key: impl Into<String>) -> Self {
        Self::SettingExists { key: key.into() }
    }

    pub fn setting_required(key: impl Into<String>) -> Self {
        Self::SettingRequired { key: key.into() }
    }

    /// Whether this is a missing tag or setting, as opposed to a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TagNotFound { .. } | Self::SettingNotFound { .. } | Self::FileNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TagDatabaseError::invalid_extension("/tmp/genres.db");
        assert!(err.to_string().contains(".thdb"));
        assert!(err.to_string().contains("/tmp/genres.db"));

        let err = TagDatabaseError::duplicate_name("Ambient");
        assert_eq!(
            err.to_string(),
            "tag \"Ambient\" already exists in the database"
        );

        let err = TagDatabaseError::tag_not_found(42_i64);
        assert_eq!(err.to_string(), "tag #42 does not exist in the database");
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(TagDatabaseError::tag_not_found("Drone").is_not_found());
        assert!(TagDatabaseError::setting_not_found("colour").is_not_found());
        assert!(!TagDatabaseError::NotInitialised.is_not_found());
        assert!(!TagDatabaseError::setting_required("version").is_not_found());
    }

    #[test]
    fn test_validation_is_transparent() {
        let err: TagDatabaseError = TagValidationError::EmptyName.into();
        assert_eq!(err.to_string(), "tag name cannot be empty");
    }
}
