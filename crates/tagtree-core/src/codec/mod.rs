//! Hierarchy codec
//!
//! Converts between external hierarchy formats and the tag model:
//! - [`Importer`]: text → [`ImportedHierarchy`] (name-keyed, no ids)
//! - [`Exporter`]: stored [`Tag`]s → text
//!
//! The only format currently supported is the MusicBee tag hierarchy
//! template, an indentation-based plain-text grammar (4 spaces per level,
//! `Name::binding` lines, `;` or `//` comments).

mod exporter;
mod importer;

pub use exporter::TemplateExporter;
pub use importer::{ImportError, TemplateImporter};

use std::collections::HashMap;
use std::path::Path;

use crate::model::{ImportedTag, Tag};

/// Number of spaces per indent level in the hierarchy template.
pub const INDENT_UNIT: usize = 4;

/// Separator between a tag name and a binding label on one template line.
pub const BINDING_SEPARATOR: &str = "::";

/// Line prefixes that mark a template line as a comment.
pub const COMMENT_MARKERS: [&str; 2] = [";", "//"];

/// An insertion-ordered map of imported tags keyed by name.
///
/// Order matters: the store inserts tags in this order, so ids follow the
/// order in which names first appeared in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedHierarchy {
    tags: Vec<ImportedTag>,
    index: HashMap<String, usize>,
}

impl ImportedHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a tag by name.
    pub fn get(&self, name: &str) -> Option<&ImportedTag> {
        self.index.get(name).map(|&i| &self.tags[i])
    }

    /// Get a mutable tag by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ImportedTag> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.tags[i]),
            None => None,
        }
    }

    /// Get the tag with the given name, inserting `default()` if absent.
    pub fn entry_or_insert_with<F>(&mut self, name: &str, default: F) -> &mut ImportedTag
    where
        F: FnOnce() -> ImportedTag,
    {
        let i = match self.index.get(name) {
            Some(&i) => i,
            None => {
                let i = self.tags.len();
                self.tags.push(default());
                self.index.insert(name.to_string(), i);
                i
            }
        };
        &mut self.tags[i]
    }

    /// Insert or replace a tag, keeping its original position if replaced.
    pub fn insert(&mut self, tag: ImportedTag) {
        match self.index.get(&tag.name) {
            Some(&i) => self.tags[i] = tag,
            None => {
                self.index.insert(tag.name.clone(), self.tags.len());
                self.tags.push(tag);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportedTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Consume the map, yielding tags in insertion order.
    pub fn into_tags(self) -> Vec<ImportedTag> {
        self.tags
    }
}

impl FromIterator<ImportedTag> for ImportedHierarchy {
    fn from_iter<T: IntoIterator<Item = ImportedTag>>(iter: T) -> Self {
        let mut hierarchy = Self::new();
        for tag in iter {
            hierarchy.insert(tag);
        }
        hierarchy
    }
}

/// Converts external text into an [`ImportedHierarchy`].
pub trait Importer {
    /// Human-readable format name, for file dialogs and messages.
    fn format_name(&self) -> &'static str;

    /// Parse hierarchy data already held in memory.
    fn import_str(&self, data: &str) -> Result<ImportedHierarchy, ImportError>;

    /// Read a file and parse its contents.
    fn import_file(&self, path: &Path) -> Result<ImportedHierarchy, ImportError> {
        let data = std::fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
        self.import_str(&data)
    }
}

/// Serialises stored tags into an external format.
pub trait Exporter {
    fn format_name(&self) -> &'static str;

    /// Export a full set of tags. Children are found through `parent_ids`.
    fn export(&self, tags: &[Tag]) -> String;
}

/// File formats the codec knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyFormat {
    /// MusicBee tag hierarchy template (`.txt`)
    MusicBeeTemplate,
}

impl HierarchyFormat {
    pub const ALL: [HierarchyFormat; 1] = [HierarchyFormat::MusicBeeTemplate];

    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            HierarchyFormat::MusicBeeTemplate => "txt",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HierarchyFormat::MusicBeeTemplate => "MusicBee tag hierarchy template",
        }
    }

    /// Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    pub fn importer(&self) -> Box<dyn Importer + Send + Sync> {
        match self {
            HierarchyFormat::MusicBeeTemplate => Box::new(TemplateImporter::new()),
        }
    }

    pub fn exporter(&self) -> Box<dyn Exporter + Send + Sync> {
        match self {
            HierarchyFormat::MusicBeeTemplate => Box::new(TemplateExporter::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            HierarchyFormat::from_path(&PathBuf::from("genres.txt")),
            Some(HierarchyFormat::MusicBeeTemplate)
        );
        assert_eq!(
            HierarchyFormat::from_path(&PathBuf::from("GENRES.TXT")),
            Some(HierarchyFormat::MusicBeeTemplate)
        );
        assert_eq!(HierarchyFormat::from_path(&PathBuf::from("genres.csv")), None);
        assert_eq!(HierarchyFormat::from_path(&PathBuf::from("genres")), None);
    }

    #[test]
    fn test_hierarchy_keeps_insertion_order() {
        let mut hierarchy = ImportedHierarchy::new();
        hierarchy.insert(ImportedTag::new("Genres", true));
        hierarchy.insert(ImportedTag::new("Ambient", false));
        hierarchy.insert(ImportedTag::new("Electronic", false));
        hierarchy.insert(ImportedTag::new("Ambient", true));

        let names: Vec<&str> = hierarchy.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Genres", "Ambient", "Electronic"]);
        assert!(hierarchy.get("Ambient").unwrap().is_top_level);
        assert_eq!(hierarchy.len(), 3);
    }

    #[test]
    fn test_entry_or_insert_with() {
        let mut hierarchy = ImportedHierarchy::new();
        hierarchy
            .entry_or_insert_with("Ambient", || ImportedTag::new("Ambient", true))
            .add_binding("genre");
        hierarchy
            .entry_or_insert_with("Ambient", || ImportedTag::new("Ambient", false))
            .add_binding("style");

        let ambient = hierarchy.get("Ambient").unwrap();
        assert!(ambient.is_top_level);
        assert_eq!(ambient.tag_bindings, vec!["genre", "style"]);
    }
}
