//! MusicBee tag hierarchy template exporter

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{Exporter, HierarchyFormat, BINDING_SEPARATOR, INDENT_UNIT};
use crate::model::{Tag, TagId};

/// Exporter for the MusicBee tag hierarchy template format.
///
/// Top-level tags are emitted in name order and each subtree is walked
/// depth-first, children also in name order. A tag with several parents is
/// written once under each of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExporter;

impl TemplateExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for TemplateExporter {
    fn format_name(&self) -> &'static str {
        HierarchyFormat::MusicBeeTemplate.name()
    }

    fn export(&self, tags: &[Tag]) -> String {
        let tree = TagTree::new(tags);
        let mut out = String::new();
        let mut path = HashSet::new();

        for tag in tree.top_level() {
            tree.write_subtree(&mut out, tag, 0, &mut path);
        }

        debug!(tags = tags.len(), bytes = out.len(), "Exported tag hierarchy template");
        out
    }
}

/// Borrowed child index over a flat tag list.
struct TagTree<'a> {
    tags: &'a [Tag],
    children: HashMap<TagId, Vec<&'a Tag>>,
}

impl<'a> TagTree<'a> {
    fn new(tags: &'a [Tag]) -> Self {
        let mut children: HashMap<TagId, Vec<&'a Tag>> = HashMap::new();
        for tag in tags {
            for parent_id in &tag.parent_ids {
                children.entry(*parent_id).or_default().push(tag);
            }
        }
        for list in children.values_mut() {
            sort_by_name(list);
        }
        Self { tags, children }
    }

    fn top_level(&self) -> Vec<&'a Tag> {
        let mut top: Vec<&Tag> = self.tags.iter().filter(|t| t.is_top_level).collect();
        sort_by_name(&mut top);
        top
    }

    fn children_of(&self, id: TagId) -> &[&'a Tag] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn write_subtree(&self, out: &mut String, tag: &Tag, depth: usize, path: &mut HashSet<TagId>) {
        // Stored hierarchies are acyclic, but never recurse forever on bad input
        if !path.insert(tag.id) {
            return;
        }

        let children = self.children_of(tag.id);
        if !children.is_empty() {
            write_line(out, depth, &tag.name);
            write_bindings(out, depth + 1, tag);
            for child in children {
                self.write_subtree(out, child, depth + 1, path);
            }
        } else if tag.tag_bindings.is_empty() {
            write_line(out, depth, &tag.name);
        } else {
            write_bindings(out, depth, tag);
        }

        path.remove(&tag.id);
    }
}

fn sort_by_name(tags: &mut [&Tag]) {
    tags.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn write_line(out: &mut String, depth: usize, text: &str) {
    out.extend(std::iter::repeat(' ').take(depth * INDENT_UNIT));
    out.push_str(text);
    out.push('\n');
}

fn write_bindings(out: &mut String, depth: usize, tag: &Tag) {
    for binding in &tag.tag_bindings {
        write_line(out, depth, &format!("{}{}{}", tag.name, BINDING_SEPARATOR, binding));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Importer, TemplateImporter};
    use pretty_assertions::assert_eq;

    fn tag(id: TagId, name: &str, parents: &[TagId]) -> Tag {
        let mut tag = if parents.is_empty() {
            Tag::top_level(name)
        } else {
            Tag::child_of(name, Vec::<String>::new())
        };
        tag.id = id;
        tag.parent_ids = parents.iter().copied().collect();
        tag.with_bindings(["genre", "style"])
    }

    fn sample_tags() -> Vec<Tag> {
        vec![
            tag(1, "Ambient", &[]),
            tag(2, "Electronic", &[]),
            tag(3, "Industrial & Noise", &[]),
            tag(4, "Post-Industrial", &[3]),
            tag(5, "Dark Ambient", &[1, 4]),
            tag(6, "Ritual Ambient", &[5]),
            tag(7, "Space Ambient", &[1, 2]),
            tag(8, "Tribal Ambient", &[1]),
        ]
    }

    const SAMPLE_EXPORT: &str = "\
Ambient
    Ambient::genre
    Ambient::style
    Dark Ambient
        Dark Ambient::genre
        Dark Ambient::style
        Ritual Ambient::genre
        Ritual Ambient::style
    Space Ambient::genre
    Space Ambient::style
    Tribal Ambient::genre
    Tribal Ambient::style
Electronic
    Electronic::genre
    Electronic::style
    Space Ambient::genre
    Space Ambient::style
Industrial & Noise
    Industrial & Noise::genre
    Industrial & Noise::style
    Post-Industrial
        Post-Industrial::genre
        Post-Industrial::style
        Dark Ambient
            Dark Ambient::genre
            Dark Ambient::style
            Ritual Ambient::genre
            Ritual Ambient::style
";

    #[test]
    fn test_export_sample_hierarchy() {
        let exported = TemplateExporter::new().export(&sample_tags());
        assert_eq!(exported, SAMPLE_EXPORT);
    }

    #[test]
    fn test_leaf_without_bindings_is_bare_name() {
        let mut tags = vec![Tag::top_level("Genres"), Tag::child_of("Drone", ["Genres"])];
        tags[0].id = 1;
        tags[1].id = 2;
        tags[1].parent_ids.insert(1);

        let exported = TemplateExporter::new().export(&tags);
        assert_eq!(exported, "Genres\n    Drone\n");
    }

    #[test]
    fn test_empty_export() {
        assert_eq!(TemplateExporter::new().export(&[]), "");
    }

    #[test]
    fn test_export_reimports_to_same_structure() {
        let exported = TemplateExporter::new().export(&sample_tags());
        let hierarchy = TemplateImporter::new().import_str(&exported).unwrap();

        assert_eq!(hierarchy.len(), 8);
        let dark = hierarchy.get("Dark Ambient").unwrap();
        assert_eq!(dark.parents, vec!["Ambient", "Post-Industrial"]);
        assert_eq!(dark.tag_bindings, vec!["genre", "style"]);

        let space = hierarchy.get("Space Ambient").unwrap();
        assert_eq!(space.parents, vec!["Ambient", "Electronic"]);

        for name in ["Ambient", "Electronic", "Industrial & Noise"] {
            let top = hierarchy.get(name).unwrap();
            assert!(top.is_top_level, "{name} should be top level");
            assert_eq!(top.tag_bindings, vec!["genre", "style"]);
        }
    }

    #[test]
    fn test_cyclic_input_terminates() {
        let mut a = tag(1, "A", &[]);
        a.parent_ids.insert(2);
        let b = tag(2, "B", &[1]);

        let exported = TemplateExporter::new().export(&[a, b]);
        assert!(exported.starts_with("A\n"));
    }
}
