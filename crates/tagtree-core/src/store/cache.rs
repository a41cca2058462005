//! In-memory mirror of the persisted tags
//!
//! The cache is only mutated after a transaction commits, so it never holds
//! state the database does not. Tags are keyed by id with two derived
//! indexes kept in step on every mutation:
//! - `by_name`: name → id
//! - `children`: parent id → child ids

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{Tag, TagId, TagKey};

#[derive(Debug, Clone, Default)]
pub struct TagCache {
    tags: BTreeMap<TagId, Tag>,
    by_name: HashMap<String, TagId>,
    children: HashMap<TagId, BTreeSet<TagId>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from freshly loaded tags, filling `parent_names` from
    /// `parent_ids`.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut cache = Self::new();
        for tag in tags {
            cache.index(&tag);
            cache.tags.insert(tag.id, tag);
        }

        let names: HashMap<TagId, String> = cache
            .tags
            .values()
            .map(|t| (t.id, t.name.clone()))
            .collect();
        for tag in cache.tags.values_mut() {
            tag.parent_names = tag
                .parent_ids
                .iter()
                .filter_map(|id| names.get(id).cloned())
                .collect();
        }
        cache
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Tag> {
        self.by_name.get(name).and_then(|id| self.tags.get(id))
    }

    pub fn get_by_key(&self, key: &TagKey) -> Option<&Tag> {
        match key {
            TagKey::Id(id) => self.get(*id),
            TagKey::Name(name) => self.get_by_name(name),
        }
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.tags.contains_key(&id)
    }

    /// Tags in id order, which is creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags listing `id` as a parent, in id order.
    pub fn children_of(&self, id: TagId) -> Vec<&Tag> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.tags.get(c)).collect())
            .unwrap_or_default()
    }

    pub fn child_count(&self, id: TagId) -> usize {
        self.children.get(&id).map_or(0, BTreeSet::len)
    }

    /// Total number of parent links.
    pub fn relationship_count(&self) -> usize {
        self.children.values().map(BTreeSet::len).sum()
    }

    /// Insert or replace a tag. Returns `true` if the id was not cached before.
    ///
    /// A rename is propagated to the `parent_names` of the tag's children.
    pub fn upsert(&mut self, tag: Tag) -> bool {
        let previous = self.tags.remove(&tag.id);
        let is_new = previous.is_none();

        if let Some(old) = previous {
            self.unindex(&old);
            if old.name != tag.name {
                self.rename_in_children(tag.id, &old.name, &tag.name);
            }
        }

        self.index(&tag);
        self.tags.insert(tag.id, tag);
        is_new
    }

    /// Remove a tag and every reference to it from the remaining tags.
    pub fn remove(&mut self, id: TagId) -> Option<Tag> {
        let tag = self.tags.remove(&id)?;
        self.unindex(&tag);

        if let Some(children) = self.children.remove(&id) {
            for child_id in children {
                if let Some(child) = self.tags.get_mut(&child_id) {
                    child.parent_ids.remove(&id);
                    child.parent_names.remove(&tag.name);
                }
            }
        }
        Some(tag)
    }

    pub fn clear(&mut self) {
        self.tags.clear();
        self.by_name.clear();
        self.children.clear();
    }

    fn index(&mut self, tag: &Tag) {
        self.by_name.insert(tag.name.clone(), tag.id);
        for parent in &tag.parent_ids {
            self.children.entry(*parent).or_default().insert(tag.id);
        }
    }

    fn unindex(&mut self, tag: &Tag) {
        if self.by_name.get(&tag.name) == Some(&tag.id) {
            self.by_name.remove(&tag.name);
        }
        for parent in &tag.parent_ids {
            if let Some(set) = self.children.get_mut(parent) {
                set.remove(&tag.id);
                if set.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }

    fn rename_in_children(&mut self, id: TagId, old: &str, new: &str) {
        let Some(children) = self.children.get(&id) else {
            return;
        };
        for child_id in children {
            if let Some(child) = self.tags.get_mut(child_id) {
                if child.parent_names.remove(old) {
                    child.parent_names.insert(new.to_string());
                }
            }
        }
    }
}
