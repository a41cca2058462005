//! MusicBee tag hierarchy template importer
//!
//! Single pass over the template, one line at a time. A parent stack holds
//! the ancestor names for the current depth:
//!
//! ```text
//! Genres                  level 0  stack []
//!     Ambient             level 1  stack [Genres]
//!         Dark Ambient    level 2  stack [Genres, Ambient]
//!     Electronic          level 1  stack [Genres]
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::{ImportedHierarchy, Importer, BINDING_SEPARATOR, COMMENT_MARKERS, INDENT_UNIT};
use crate::model::ImportedTag;

/// Errors raised while parsing a hierarchy template.
///
/// Line numbers are 1-based physical lines of the input.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("tab characters were detected, which is an invalid structure for tag hierarchy templates")]
    TabsDetected,

    #[error("tag hierarchy starts with a space, which is not valid for a tag hierarchy template")]
    StartsWithSpace,

    #[error("uneven indent was found at line {line}")]
    UnevenIndent { line: usize },

    #[error("excessive indent was detected at line {line}")]
    ExcessiveIndent { line: usize },

    #[error("indent level {level} at line {line} exceeds the parent stack depth {depth}")]
    PopOutOfRange {
        line: usize,
        level: usize,
        depth: usize,
    },

    #[error("empty tag name at line {line}")]
    EmptyTagName { line: usize },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The offending line, for errors tied to one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnevenIndent { line }
            | Self::ExcessiveIndent { line }
            | Self::EmptyTagName { line }
            | Self::PopOutOfRange { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// One parsed, non-comment template line.
#[derive(Debug, PartialEq, Eq)]
struct TemplateLine<'a> {
    number: usize,
    indent_level: usize,
    tag_name: &'a str,
    binding: Option<&'a str>,
}

impl<'a> TemplateLine<'a> {
    fn parse(raw: &'a str, number: usize) -> Result<Self, ImportError> {
        let content = raw.trim_start_matches(' ');
        let leading = raw.len() - content.len();
        if leading % INDENT_UNIT != 0 {
            return Err(ImportError::UnevenIndent { line: number });
        }

        let content = content.trim_end();
        let (tag_name, binding) = match content.rfind(BINDING_SEPARATOR) {
            Some(pos) => {
                let binding = &content[pos + BINDING_SEPARATOR.len()..];
                (
                    &content[..pos],
                    Some(binding).filter(|b| !b.is_empty()),
                )
            }
            None => (content, None),
        };

        if tag_name.is_empty() {
            return Err(ImportError::EmptyTagName { line: number });
        }

        Ok(Self {
            number,
            indent_level: leading / INDENT_UNIT,
            tag_name,
            binding,
        })
    }
}

/// Importer for the MusicBee tag hierarchy template format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateImporter;

impl TemplateImporter {
    pub fn new() -> Self {
        Self
    }

    fn validate(data: &str) -> Result<(), ImportError> {
        if data.contains('\t') {
            return Err(ImportError::TabsDetected);
        }
        if data.starts_with(' ') {
            return Err(ImportError::StartsWithSpace);
        }
        Ok(())
    }

    fn is_blank_or_comment(line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty() || COMMENT_MARKERS.iter().any(|m| trimmed.starts_with(m))
    }

    fn update_parent_stack(
        stack: &mut Vec<String>,
        line: &TemplateLine<'_>,
        previous_level: usize,
        previous_name: Option<&str>,
    ) -> Result<(), ImportError> {
        if line.indent_level > previous_level {
            let Some(parent) = previous_name else {
                // First tag line of the document is indented
                return Err(ImportError::ExcessiveIndent { line: line.number });
            };
            if line.indent_level - previous_level > 1 {
                return Err(ImportError::ExcessiveIndent { line: line.number });
            }
            stack.push(parent.to_string());
        } else if line.indent_level < previous_level {
            if line.indent_level > stack.len() {
                return Err(ImportError::PopOutOfRange {
                    line: line.number,
                    level: line.indent_level,
                    depth: stack.len(),
                });
            }
            stack.truncate(line.indent_level);
        }
        Ok(())
    }

    fn upsert(hierarchy: &mut ImportedHierarchy, line: &TemplateLine<'_>, stack: &[String]) {
        let tag = hierarchy.entry_or_insert_with(line.tag_name, || {
            ImportedTag::new(line.tag_name, stack.is_empty())
        });

        match stack.last() {
            Some(parent) => {
                tag.add_parent(parent.as_str());
            }
            None => tag.is_top_level = true,
        }

        if let Some(binding) = line.binding {
            tag.add_binding(binding);
        }
    }
}

impl Importer for TemplateImporter {
    fn format_name(&self) -> &'static str {
        super::HierarchyFormat::MusicBeeTemplate.name()
    }

    fn import_str(&self, data: &str) -> Result<ImportedHierarchy, ImportError> {
        let data = data.trim_end();
        Self::validate(data)?;

        let mut hierarchy = ImportedHierarchy::new();
        let mut stack: Vec<String> = Vec::new();
        let mut previous_level = 0;
        let mut previous_name: Option<&str> = None;

        for (index, raw) in data.lines().enumerate() {
            if Self::is_blank_or_comment(raw) {
                continue;
            }

            let line = TemplateLine::parse(raw, index + 1)?;
            Self::update_parent_stack(&mut stack, &line, previous_level, previous_name)?;
            Self::upsert(&mut hierarchy, &line, &stack);

            previous_level = line.indent_level;
            previous_name = Some(line.tag_name);
        }

        debug!(tags = hierarchy.len(), "Parsed tag hierarchy template");
        Ok(hierarchy)
    }
}
