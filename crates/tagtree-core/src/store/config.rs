//! Per-store settings supplied by the caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// SQLite journal mode applied when a database is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Rollback journal deleted after each transaction (single file at rest)
    #[default]
    Delete,
    /// Write-ahead log
    Wal,
    /// Journal kept in memory
    Memory,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
        }
    }
}

impl fmt::Display for JournalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_pragma().to_ascii_lowercase())
    }
}

impl FromStr for JournalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Ok(JournalMode::Delete),
            "wal" => Ok(JournalMode::Wal),
            "memory" => Ok(JournalMode::Memory),
            other => Err(format!(
                "unknown journal mode '{}', expected delete, wal or memory",
                other
            )),
        }
    }
}

/// Configuration owned by a [`TagDatabase`](super::TagDatabase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Bindings written to `default_tag_bind` when a database is created,
    /// and restored by a settings reset
    pub default_bindings: Vec<String>,
    pub journal_mode: JournalMode,
    /// Enforce `ON DELETE CASCADE` on parent links
    pub foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_bindings: vec!["genre".to_string()],
            journal_mode: JournalMode::default(),
            foreign_keys: true,
        }
    }
}

impl StoreConfig {
    pub fn with_default_bindings<I, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_bindings = bindings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}
