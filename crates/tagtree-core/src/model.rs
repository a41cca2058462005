//! Tag entity model
//!
//! Two shapes of tag exist:
//! - [`Tag`]: a stored (or about-to-be-stored) entity with an id and id-keyed parents
//! - [`ImportedTag`]: the codec's intermediate form, with parents keyed by name only
//!
//! They are connected by [`ImportedTag::into_tag`], which produces a transient
//! tag whose parent ids are resolved by the store.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned tag identifier. `0` marks a transient tag.
pub type TagId = i64;

/// Id value for a tag that has not been persisted yet.
pub const TRANSIENT_ID: TagId = 0;

/// Separator used to flatten list columns (`tags_to_bind`, `also_known_as`,
/// `default_tag_bind`).
pub const LIST_SEPARATOR: char = ';';

/// Errors raised when a tag fails self-validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagValidationError {
    #[error("tag name cannot be empty")]
    EmptyName,

    #[error("tag '{name}' has no parents specified, so cannot be non-top-level")]
    Orphan { name: String },

    #[error("tag '{name}' has itself as a parent, which is invalid")]
    SelfParent { name: String },
}

/// Lookup key for operations that accept either an id or a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKey {
    Id(TagId),
    Name(String),
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKey::Id(id) => write!(f, "#{}", id),
            TagKey::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<TagId> for TagKey {
    fn from(id: TagId) -> Self {
        TagKey::Id(id)
    }
}

impl From<&str> for TagKey {
    fn from(name: &str) -> Self {
        TagKey::Name(name.to_string())
    }
}

impl From<String> for TagKey {
    fn from(name: String) -> Self {
        TagKey::Name(name)
    }
}

impl From<&String> for TagKey {
    fn from(name: &String) -> Self {
        TagKey::Name(name.clone())
    }
}

/// A node in the tag hierarchy.
///
/// `parent_names` is a denormalised view of `parent_ids` used for edit
/// round-trips: on write, the store resolves `parent_names` to ids and
/// replaces `parent_ids` with the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub is_top_level: bool,
    #[serde(default)]
    pub parent_ids: BTreeSet<TagId>,
    #[serde(default)]
    pub parent_names: BTreeSet<String>,
    /// Export bindings, in insertion order, without duplicates
    #[serde(default)]
    pub tag_bindings: Vec<String>,
    /// Alternate names searched alongside `name`
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
}

impl Tag {
    /// Create a transient top-level tag.
    pub fn top_level(name: impl Into<String>) -> Self {
        Self::transient(name, true)
    }

    /// Create a transient child tag of the given parents.
    pub fn child_of<I, S>(name: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tag = Self::transient(name, false);
        tag.parent_names = parents.into_iter().map(Into::into).collect();
        tag
    }

    fn transient(name: impl Into<String>, is_top_level: bool) -> Self {
        Self {
            id: TRANSIENT_ID,
            name: name.into(),
            notes: String::new(),
            is_top_level,
            parent_ids: BTreeSet::new(),
            parent_names: BTreeSet::new(),
            tag_bindings: Vec::new(),
            aliases: Vec::new(),
            date_created: None,
            date_modified: None,
        }
    }

    /// Builder-style: set the tag bindings.
    pub fn with_bindings<I, S>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_bindings.clear();
        for binding in bindings {
            self.add_binding(binding);
        }
        self
    }

    /// Builder-style: set the aliases.
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.clear();
        for alias in aliases {
            self.add_alias(alias);
        }
        self
    }

    /// Builder-style: set the notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Whether the tag has not been persisted yet.
    pub fn is_transient(&self) -> bool {
        self.id == TRANSIENT_ID
    }

    /// Add a binding, keeping the list free of duplicates. Returns `true` if added.
    pub fn add_binding(&mut self, binding: impl Into<String>) -> bool {
        push_unique(&mut self.tag_bindings, binding.into())
    }

    /// Add an alias, keeping the list free of duplicates. Returns `true` if added.
    pub fn add_alias(&mut self, alias: impl Into<String>) -> bool {
        push_unique(&mut self.aliases, alias.into())
    }

    /// Check the tag's structural invariants.
    ///
    /// - a non-top-level tag must have at least one parent (by id or by name)
    /// - the tag must not list itself as a parent
    pub fn validate(&self) -> Result<(), TagValidationError> {
        if self.name.trim().is_empty() {
            return Err(TagValidationError::EmptyName);
        }

        if !self.is_top_level && self.parent_ids.is_empty() && self.parent_names.is_empty() {
            return Err(TagValidationError::Orphan {
                name: self.name.clone(),
            });
        }

        let self_by_id = !self.is_transient() && self.parent_ids.contains(&self.id);
        if self_by_id || self.parent_names.contains(&self.name) {
            return Err(TagValidationError::SelfParent {
                name: self.name.clone(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag_bindings.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.tag_bindings.join("; "))
        }
    }
}

/// A tag produced by an importer, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedTag {
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub is_top_level: bool,
    /// Parent names, in first-seen order
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub tag_bindings: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ImportedTag {
    pub fn new(name: impl Into<String>, is_top_level: bool) -> Self {
        Self {
            name: name.into(),
            notes: String::new(),
            is_top_level,
            parents: Vec::new(),
            tag_bindings: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Add a parent name. A tag is never recorded as its own parent.
    pub fn add_parent(&mut self, parent: impl Into<String>) -> bool {
        let parent = parent.into();
        if parent == self.name {
            return false;
        }
        push_unique(&mut self.parents, parent)
    }

    pub fn add_binding(&mut self, binding: impl Into<String>) -> bool {
        push_unique(&mut self.tag_bindings, binding.into())
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) -> bool {
        push_unique(&mut self.aliases, alias.into())
    }

    /// Convert into a transient [`Tag`]. Parent ids are left empty for the
    /// store to resolve from the names.
    pub fn into_tag(self) -> Tag {
        Tag {
            id: TRANSIENT_ID,
            name: self.name,
            notes: self.notes,
            is_top_level: self.is_top_level,
            parent_ids: BTreeSet::new(),
            parent_names: self.parents.into_iter().collect(),
            tag_bindings: self.tag_bindings,
            aliases: self.aliases,
            date_created: None,
            date_modified: None,
        }
    }
}

/// Split a semicolon-joined list column, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Join a list for storage in a semicolon-joined column.
pub fn join_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            joined.push(LIST_SEPARATOR);
        }
        joined.push_str(value.as_ref());
    }
    joined
}

fn push_unique(list: &mut Vec<String>, value: String) -> bool {
    if value.is_empty() || list.contains(&value) {
        return false;
    }
    list.push(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_without_parents_is_valid() {
        let tag = Tag::top_level("Ambient").with_bindings(["genre", "style"]);
        assert!(tag.validate().is_ok());
    }

    #[test]
    fn test_top_level_with_parents_is_valid() {
        let mut tag = Tag::child_of("Country", ["Northern American Music"])
            .with_notes("asdfghjkl")
            .with_aliases(["Country and Western"]);
        tag.is_top_level = true;
        assert!(tag.validate().is_ok());
    }

    #[test]
    fn test_toggling_top_level_with_parent_stays_valid() {
        let mut tag = Tag::child_of("Ritual Ambient", ["Ambient"]);
        assert!(tag.validate().is_ok());
        tag.is_top_level = true;
        assert!(tag.validate().is_ok());
    }

    #[test]
    fn test_orphan_rejected() {
        let tag = Tag::child_of("Orphan Tag Test", Vec::<String>::new());
        assert_eq!(
            tag.validate(),
            Err(TagValidationError::Orphan {
                name: "Orphan Tag Test".to_string()
            })
        );
    }

    #[test]
    fn test_orphan_with_parent_id_is_valid() {
        let mut tag = Tag::child_of("Dark Ambient", Vec::<String>::new());
        tag.parent_ids.insert(4);
        assert!(tag.validate().is_ok());
    }

    #[test]
    fn test_self_parent_by_name_rejected() {
        let tag = Tag::child_of("Ambient", ["Ambient"]);
        assert!(matches!(
            tag.validate(),
            Err(TagValidationError::SelfParent { .. })
        ));
    }

    #[test]
    fn test_self_parent_by_id_rejected_even_when_top_level() {
        let mut tag = Tag::top_level("Ambient");
        tag.id = 7;
        tag.parent_ids.insert(7);
        assert!(matches!(
            tag.validate(),
            Err(TagValidationError::SelfParent { .. })
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            Tag::top_level("   ").validate(),
            Err(TagValidationError::EmptyName)
        );
    }

    #[test]
    fn test_bindings_deduplicated_in_order() {
        let mut tag = Tag::top_level("Ambient");
        assert!(tag.add_binding("genre"));
        assert!(tag.add_binding("style"));
        assert!(!tag.add_binding("genre"));
        assert_eq!(tag.tag_bindings, vec!["genre", "style"]);
    }

    #[test]
    fn test_display_includes_bindings() {
        let tag = Tag::top_level("Ambient").with_bindings(["genre", "style"]);
        assert_eq!(tag.to_string(), "Ambient (genre; style)");
        assert_eq!(Tag::top_level("Genres").to_string(), "Genres");
    }

    #[test]
    fn test_imported_tag_skips_self_parent() {
        let mut imported = ImportedTag::new("Ambient", false);
        assert!(!imported.add_parent("Ambient"));
        assert!(imported.add_parent("Genres"));
        assert!(!imported.add_parent("Genres"));
        assert_eq!(imported.parents, vec!["Genres"]);
    }

    #[test]
    fn test_imported_tag_into_tag() {
        let mut imported = ImportedTag::new("Dark Ambient", false);
        imported.add_parent("Ambient");
        imported.add_parent("Post-Industrial");
        imported.add_binding("genre");

        let tag = imported.into_tag();
        assert!(tag.is_transient());
        assert!(tag.parent_ids.is_empty());
        assert_eq!(tag.parent_names.len(), 2);
        assert_eq!(tag.tag_bindings, vec!["genre"]);
    }

    #[test]
    fn test_list_round_trip() {
        assert_eq!(split_list("genre;style"), vec!["genre", "style"]);
        assert_eq!(split_list(" genre ; ;style "), vec!["genre", "style"]);
        assert!(split_list("").is_empty());
        assert_eq!(join_list(["genre", "style"]), "genre;style");
        assert_eq!(join_list(Vec::<String>::new()), "");
    }
}
