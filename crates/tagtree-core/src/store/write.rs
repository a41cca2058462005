//! Transactional writes
//!
//! Every mutation runs inside [`TagDatabase::transaction`]. The closure gets a
//! [`WriteScope`] bound to the open transaction; the scope records what it
//! changed, and only after a successful commit are those changes applied to
//! the cache and published as events. A failed closure or commit rolls back
//! and leaves the cache untouched.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, trace, warn};

use super::database::{select_tag, TagDatabase};
use super::error::TagDatabaseError;
use super::events::{DatabaseEditResult, DatabaseEvent, DeletedTag};
use super::schema::QUERY_IS_DESCENDANT;
use crate::codec::ImportedHierarchy;
use crate::model::{join_list, ImportedTag, Tag, TagId, TagKey, TagValidationError};

/// A change made inside a transaction, held until commit.
#[derive(Debug)]
enum PendingChange {
    Written(Tag),
    Deleted(DeletedTag),
}

/// Write access to one open transaction.
///
/// Reads through the scope see the transaction's own uncommitted writes.
pub struct WriteScope<'a> {
    conn: &'a Connection,
    changes: Vec<PendingChange>,
}

impl<'a> WriteScope<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            changes: Vec::new(),
        }
    }

    /// Insert a transient tag or update a persisted one, replacing its
    /// parent links. Returns the tag as stored, with id, resolved parents
    /// and timestamps.
    ///
    /// Parents are taken from `parent_names` when any are given, otherwise
    /// from `parent_ids`.
    pub fn write_tag(&mut self, mut tag: Tag) -> Result<Tag, TagDatabaseError> {
        tag.validate()?;
        self.check_unique_name(&tag)?;

        let parents = self.resolve_parents(&tag)?;
        if !tag.is_transient() {
            self.check_cycles(&tag, &parents)?;
        }

        let (id, date_created, date_modified) = if tag.is_transient() {
            self.insert_row(&tag)?
        } else {
            self.update_row(&tag)?
        };
        tag.id = id;
        tag.date_created = date_created;
        tag.date_modified = date_modified;

        self.replace_parent_links(id, &parents)?;
        tag.parent_ids = parents.iter().map(|(id, _)| *id).collect();
        tag.parent_names = parents.into_iter().map(|(_, name)| name).collect();

        trace!(id, name = %tag.name, "Tag written");
        self.changes.push(PendingChange::Written(tag.clone()));
        Ok(tag)
    }

    /// Write several tags in order. Stops at the first failure.
    pub fn write_tags(
        &mut self,
        tags: impl IntoIterator<Item = Tag>,
    ) -> Result<Vec<Tag>, TagDatabaseError> {
        tags.into_iter().map(|tag| self.write_tag(tag)).collect()
    }

    /// Delete a tag that has no children.
    pub fn delete_tag(&mut self, key: impl Into<TagKey>) -> Result<DeletedTag, TagDatabaseError> {
        let key = key.into();
        let tag = select_tag(self.conn, &key)?.ok_or_else(|| TagDatabaseError::tag_not_found(key))?;

        let children: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tag_parent_link WHERE parent_tag_id = ?1",
            params![tag.id],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(TagDatabaseError::TagHasChildren {
                name: tag.name,
                count: children as usize,
            });
        }

        self.conn.execute(
            "DELETE FROM tag_parent_link WHERE target_tag_id = ?1",
            params![tag.id],
        )?;
        self.conn
            .execute("DELETE FROM tag WHERE id = ?1", params![tag.id])?;

        let deleted = DeletedTag {
            id: tag.id,
            name: tag.name,
        };
        trace!(id = deleted.id, name = %deleted.name, "Tag deleted");
        self.changes.push(PendingChange::Deleted(deleted.clone()));
        Ok(deleted)
    }

    /// Fetch a tag from storage, including writes made in this scope.
    pub fn select_tag(&self, key: impl Into<TagKey>) -> Result<Option<Tag>, TagDatabaseError> {
        Ok(select_tag(self.conn, &key.into())?)
    }

    /// First import phase: insert a row with no parents so that every name
    /// in the hierarchy has an id before links are attached.
    fn insert_imported(&mut self, imported: &ImportedTag) -> Result<TagId, TagDatabaseError> {
        let mut tag = Tag::top_level(imported.name.as_str())
            .with_notes(imported.notes.as_str())
            .with_bindings(imported.tag_bindings.iter().cloned());
        tag.is_top_level = imported.is_top_level;
        if tag.name.trim().is_empty() {
            return Err(TagValidationError::EmptyName.into());
        }

        self.check_unique_name(&tag)?;
        let (id, _, _) = self.insert_row(&tag)?;
        Ok(id)
    }

    fn clear_all(&mut self) -> Result<usize, TagDatabaseError> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM tag ORDER BY id")?;
        let deleted = stmt
            .query_map([], |row| {
                Ok(DeletedTag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.conn.execute("DELETE FROM tag_parent_link", [])?;
        self.conn.execute("DELETE FROM tag", [])?;

        let count = deleted.len();
        self.changes
            .extend(deleted.into_iter().map(PendingChange::Deleted));
        Ok(count)
    }

    fn check_unique_name(&self, tag: &Tag) -> Result<(), TagDatabaseError> {
        let existing: Option<TagId> = self
            .conn
            .query_row(
                "SELECT id FROM tag WHERE name = ?1",
                params![tag.name],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) if id != tag.id => Err(TagDatabaseError::duplicate_name(tag.name.as_str())),
            _ => Ok(()),
        }
    }

    /// Resolve the tag's parents to `(id, name)` pairs against storage.
    fn resolve_parents(&self, tag: &Tag) -> Result<Vec<(TagId, String)>, TagDatabaseError> {
        let mut parents = Vec::new();

        if !tag.parent_names.is_empty() {
            for name in &tag.parent_names {
                let id: TagId = self
                    .conn
                    .query_row(
                        "SELECT id FROM tag WHERE name = ?1",
                        params![name],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| TagDatabaseError::tag_not_found(name))?;
                parents.push((id, name.clone()));
            }
        } else {
            for id in &tag.parent_ids {
                let name: String = self
                    .conn
                    .query_row(
                        "SELECT name FROM tag WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(|| TagDatabaseError::tag_not_found(*id))?;
                parents.push((*id, name));
            }
        }

        if !tag.is_transient() && parents.iter().any(|(id, _)| *id == tag.id) {
            return Err(TagValidationError::SelfParent {
                name: tag.name.clone(),
            }
            .into());
        }
        Ok(parents)
    }

    /// Reject a parent that is already below the tag.
    fn check_cycles(&self, tag: &Tag, parents: &[(TagId, String)]) -> Result<(), TagDatabaseError> {
        for (parent_id, parent_name) in parents {
            let is_descendant = self
                .conn
                .query_row(QUERY_IS_DESCENDANT, params![tag.id, parent_id], |_| Ok(()))
                .optional()?
                .is_some();
            if is_descendant {
                return Err(TagDatabaseError::ParentCycle {
                    name: tag.name.clone(),
                    parent: parent_name.clone(),
                });
            }
        }
        Ok(())
    }

    fn insert_row(
        &self,
        tag: &Tag,
    ) -> Result<(TagId, Option<String>, Option<String>), TagDatabaseError> {
        let row = self.conn.query_row(
            "INSERT INTO tag (name, notes, top_level, tags_to_bind, also_known_as,
                              date_created, date_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
             RETURNING id, date_created, date_modified",
            params![
                tag.name,
                tag.notes,
                tag.is_top_level,
                join_list(&tag.tag_bindings),
                join_list(&tag.aliases)
            ],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(row)
    }

    fn update_row(
        &self,
        tag: &Tag,
    ) -> Result<(TagId, Option<String>, Option<String>), TagDatabaseError> {
        self.conn
            .query_row(
                "UPDATE tag
                 SET name = ?2, notes = ?3, top_level = ?4, tags_to_bind = ?5,
                     also_known_as = ?6, date_modified = CURRENT_TIMESTAMP
                 WHERE id = ?1
                 RETURNING id, date_created, date_modified",
                params![
                    tag.id,
                    tag.name,
                    tag.notes,
                    tag.is_top_level,
                    join_list(&tag.tag_bindings),
                    join_list(&tag.aliases)
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?
            .ok_or_else(|| TagDatabaseError::tag_not_found(tag.id))
    }

    fn replace_parent_links(
        &self,
        id: TagId,
        parents: &[(TagId, String)],
    ) -> Result<(), TagDatabaseError> {
        self.conn.execute(
            "DELETE FROM tag_parent_link WHERE target_tag_id = ?1",
            params![id],
        )?;

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO tag_parent_link (target_tag_id, parent_tag_id) VALUES (?1, ?2)",
        )?;
        for (parent_id, _) in parents {
            stmt.execute(params![id, parent_id])?;
        }
        Ok(())
    }

    fn into_changes(self) -> Vec<PendingChange> {
        self.changes
    }
}

impl TagDatabase {
    /// Run `f` inside one transaction.
    ///
    /// On `Err` from `f` (or a failed commit) everything is rolled back and
    /// the cache is left as it was. On success the cache is updated and
    /// events are published before this returns.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T, TagDatabaseError>
    where
        F: FnOnce(&mut WriteScope<'_>) -> Result<T, TagDatabaseError>,
    {
        self.run_transaction(f).map(|(value, _)| value)
    }

    fn run_transaction<T, F>(&mut self, f: F) -> Result<(T, DatabaseEditResult), TagDatabaseError>
    where
        F: FnOnce(&mut WriteScope<'_>) -> Result<T, TagDatabaseError>,
    {
        let conn = self.connection()?;
        let tx = conn.unchecked_transaction()?;
        let mut scope = WriteScope::new(&tx);

        let value = match f(&mut scope) {
            Ok(value) => value,
            Err(e) => {
                drop(scope);
                debug!(error = %e, "Rolling back tag transaction");
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "Rollback failed");
                }
                return Err(e);
            }
        };

        let changes = scope.into_changes();
        tx.commit()?;

        let result = self.apply_changes(changes);
        self.publish_changes(&result);
        Ok((value, result))
    }

    fn apply_changes(&mut self, changes: Vec<PendingChange>) -> DatabaseEditResult {
        let mut result = DatabaseEditResult::default();
        for change in changes {
            match change {
                PendingChange::Written(tag) => {
                    let existed = self.cache.contains(tag.id);
                    self.cache.upsert(tag.clone());
                    result.record_write(tag, existed);
                }
                PendingChange::Deleted(deleted) => {
                    self.cache.remove(deleted.id);
                    result.record_delete(deleted);
                }
            }
        }
        result
    }

    fn publish_changes(&mut self, result: &DatabaseEditResult) {
        for deleted in &result.deleted {
            self.events.publish(DatabaseEvent::TagDeleted {
                id: deleted.id,
                name: deleted.name.clone(),
            });
        }
        if !result.is_empty() {
            self.events.publish(DatabaseEvent::TagsWritten(result.clone()));
        }
    }

    /// Write one tag in its own transaction.
    pub fn write_tag(&mut self, tag: Tag) -> Result<Tag, TagDatabaseError> {
        self.ensure_initialised()?;
        self.transaction(|scope| scope.write_tag(tag))
    }

    /// Write several tags atomically.
    pub fn write_tags(
        &mut self,
        tags: impl IntoIterator<Item = Tag>,
    ) -> Result<DatabaseEditResult, TagDatabaseError> {
        self.ensure_initialised()?;
        self.run_transaction(|scope| scope.write_tags(tags))
            .map(|(_, result)| result)
    }

    /// Delete a tag by id or name. Fails while the tag has children.
    pub fn delete_tag(&mut self, key: impl Into<TagKey>) -> Result<DeletedTag, TagDatabaseError> {
        self.ensure_initialised()?;
        let key = key.into();
        let deleted = self.transaction(|scope| scope.delete_tag(key))?;
        info!(id = deleted.id, name = %deleted.name, "Deleted tag");
        Ok(deleted)
    }

    /// Remove every tag and link. Settings are kept.
    pub fn clear_tags(&mut self) -> Result<usize, TagDatabaseError> {
        self.ensure_initialised()?;
        let count = self.transaction(|scope| scope.clear_all())?;
        info!(count, "Cleared all tags");
        Ok(count)
    }

    /// Persist an imported hierarchy in one transaction.
    ///
    /// Phase one inserts every tag so all names have ids; phase two attaches
    /// parents and aliases. Any failure rolls back the whole import.
    pub fn import(
        &mut self,
        hierarchy: ImportedHierarchy,
    ) -> Result<DatabaseEditResult, TagDatabaseError> {
        self.connection()?;
        let total = hierarchy.len();
        info!(tags = total, "Importing tag hierarchy");

        let (_, result) = self.run_transaction(|scope| {
            let mut inserted = Vec::with_capacity(total);
            for imported in hierarchy.iter() {
                inserted.push(scope.insert_imported(imported)?);
            }

            for (id, imported) in inserted.into_iter().zip(hierarchy.into_tags()) {
                let mut tag = imported.into_tag();
                tag.id = id;
                scope.write_tag(tag)?;
            }
            Ok(())
        })?;

        info!(added = result.added.len(), "Import complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::IN_MEMORY_PATH;

    fn memory_db() -> TagDatabase {
        let mut db = TagDatabase::default();
        db.create(IN_MEMORY_PATH, false, None).unwrap();
        db
    }

    #[test]
    fn test_insert_assigns_id_and_timestamps() {
        let mut db = memory_db();
        let tag = db.write_tag(Tag::top_level("Ambient")).unwrap();
        assert!(tag.id > 0);
        assert!(tag.date_created.is_some());
        assert!(tag.date_modified.is_some());
        assert_eq!(db.tag(tag.id).unwrap().name, "Ambient");
    }

    #[test]
    fn test_parent_ids_used_when_names_absent() {
        let mut db = memory_db();
        let ambient = db.write_tag(Tag::top_level("Ambient")).unwrap();

        let mut drone = Tag::child_of("Drone", Vec::<String>::new());
        drone.parent_ids.insert(ambient.id);
        let drone = db.write_tag(drone).unwrap();

        assert!(drone.parent_names.contains("Ambient"));
        assert_eq!(db.children("Ambient").len(), 1);
    }

    #[test]
    fn test_scope_sees_own_writes() {
        let mut db = memory_db();
        let selected = db
            .transaction(|scope| {
                scope.write_tag(Tag::top_level("Ambient"))?;
                scope.write_tag(Tag::child_of("Drone", ["Ambient"]))?;
                scope.select_tag("Drone")
            })
            .unwrap()
            .unwrap();

        assert!(selected.parent_names.contains("Ambient"));
        assert_eq!(db.tag_count(), 2);
    }

    #[test]
    fn test_failed_scope_rolls_back() {
        let mut db = memory_db();
        let result = db.transaction(|scope| {
            scope.write_tag(Tag::top_level("Ambient"))?;
            scope.write_tag(Tag::child_of("Drone", ["Missing"]))
        });

        assert!(matches!(
            result,
            Err(TagDatabaseError::TagNotFound { key: TagKey::Name(ref n) }) if n == "Missing"
        ));
        assert_eq!(db.tag_count(), 0);
        assert!(db.select_tag("Ambient").unwrap().is_none());
    }

    #[test]
    fn test_update_missing_id_is_not_found() {
        let mut db = memory_db();
        let mut ghost = Tag::top_level("Ghost");
        ghost.id = 99;
        let err = db.write_tag(ghost).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_edit_result_from_bulk_write() {
        let mut db = memory_db();
        let ambient = db.write_tag(Tag::top_level("Ambient")).unwrap();

        let renamed = Tag {
            name: "Ambient Music".to_string(),
            ..ambient
        };
        let result = db
            .write_tags(vec![renamed, Tag::top_level("Electronic")])
            .unwrap();

        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].name, "Ambient Music");
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].name, "Electronic");
        assert!(result.deleted.is_empty());
    }

    #[test]
    fn test_clear_tags() {
        let mut db = memory_db();
        db.write_tag(Tag::top_level("Ambient")).unwrap();
        db.write_tag(Tag::child_of("Drone", ["Ambient"])).unwrap();

        assert_eq!(db.clear_tags().unwrap(), 2);
        assert_eq!(db.tag_count(), 0);
        assert_eq!(db.relationship_count(), 0);
        assert_eq!(db.default_tag_bindings(), ["genre"]);
    }

    #[test]
    fn test_writes_require_initialisation() {
        let mut db = TagDatabase::default();
        assert!(matches!(
            db.write_tag(Tag::top_level("Ambient")),
            Err(TagDatabaseError::NotInitialised)
        ));
        assert!(matches!(
            db.delete_tag("Ambient"),
            Err(TagDatabaseError::NotInitialised)
        ));
    }
}
