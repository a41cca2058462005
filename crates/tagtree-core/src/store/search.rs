//! Search over the cached tags

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::database::TagDatabase;
use crate::model::Tag;
use crate::normalize::normalize_for_search;

/// How a normalised query is compared with a normalised candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Substring match
    #[default]
    Fuzzy,
    StartsWith,
    EndsWith,
    #[serde(rename = "exact", alias = "exact-match")]
    ExactMatch,
}

impl SearchMode {
    pub const ALL: [SearchMode; 4] = [
        SearchMode::Fuzzy,
        SearchMode::StartsWith,
        SearchMode::EndsWith,
        SearchMode::ExactMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Fuzzy => "fuzzy",
            SearchMode::StartsWith => "starts-with",
            SearchMode::EndsWith => "ends-with",
            SearchMode::ExactMatch => "exact",
        }
    }

    /// Compare already-normalised strings.
    pub fn matches(&self, candidate: &str, query: &str) -> bool {
        match self {
            SearchMode::Fuzzy => candidate.contains(query),
            SearchMode::StartsWith => candidate.starts_with(query),
            SearchMode::EndsWith => candidate.ends_with(query),
            SearchMode::ExactMatch => candidate == query,
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "fuzzy" | "contains" => Ok(SearchMode::Fuzzy),
            "starts-with" | "startswith" | "prefix" => Ok(SearchMode::StartsWith),
            "ends-with" | "endswith" | "suffix" => Ok(SearchMode::EndsWith),
            "exact" | "exact-match" | "exactmatch" => Ok(SearchMode::ExactMatch),
            other => Err(format!(
                "unknown search mode '{}', expected fuzzy, starts-with, ends-with or exact",
                other
            )),
        }
    }
}

impl TagDatabase {
    /// Tags whose name matches `query`, ignoring case and diacritics.
    pub fn search(&self, query: &str, mode: SearchMode) -> Vec<&Tag> {
        let query = normalize_for_search(query.trim());
        self.tags()
            .filter(|tag| mode.matches(&normalize_for_search(&tag.name), &query))
            .collect()
    }

    /// Like [`search`](Self::search), also matching any alias.
    pub fn search_with_aliases(&self, query: &str, mode: SearchMode) -> Vec<&Tag> {
        let query = normalize_for_search(query.trim());
        self.tags()
            .filter(|tag| {
                std::iter::once(&tag.name)
                    .chain(tag.aliases.iter())
                    .any(|candidate| mode.matches(&normalize_for_search(candidate), &query))
            })
            .collect()
    }
}
