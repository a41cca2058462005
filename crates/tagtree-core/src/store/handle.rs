//! Async access to a shared [`TagDatabase`]
//!
//! Storage calls run on tokio's blocking pool so an async caller (a UI event
//! loop, a server task) is never stalled by SQLite. Cache reads are cheap and
//! are served inline under the lock.
//!
//! The handle serialises access with a mutex; it does not make concurrent
//! writers meaningful, it only keeps them from overlapping. Events raised
//! under the lock are held back and delivered once it is released, so an
//! observer may call back into the handle.

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::database::TagDatabase;
use super::error::TagDatabaseError;
use super::events::{DatabaseEditResult, DatabaseEvent, DeletedTag, SubscriptionId};
use super::search::SearchMode;
use super::StoreConfig;
use crate::codec::ImportedHierarchy;
use crate::model::{Tag, TagKey};

/// Cloneable async handle to one database.
#[derive(Debug, Clone)]
pub struct TagDatabaseHandle {
    inner: Arc<Mutex<TagDatabase>>,
}

impl TagDatabaseHandle {
    pub fn new(config: StoreConfig) -> Self {
        Self::from_database(TagDatabase::new(config))
    }

    pub fn from_database(mut db: TagDatabase) -> Self {
        db.events.set_deferred(true);
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    /// Lock the database for direct synchronous use.
    ///
    /// Events raised through the guard are delivered when it is dropped.
    pub fn lock(&self) -> DatabaseGuard<'_> {
        DatabaseGuard::new(self.inner.lock())
    }

    /// Run a closure against the database on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, TagDatabaseError>
    where
        F: FnOnce(&mut TagDatabase) -> Result<T, TagDatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut db = DatabaseGuard::new(inner.lock());
            f(&mut *db)
        })
        .await
        .map_err(|e| TagDatabaseError::Task(format!("Blocking task panicked: {}", e)))?
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn create(
        &self,
        path: impl Into<PathBuf>,
        overwrite: bool,
        seed: Option<ImportedHierarchy>,
    ) -> Result<(), TagDatabaseError> {
        let path = path.into();
        self.run(move |db| db.create(path, overwrite, seed)).await
    }

    pub async fn load(&self, path: impl Into<PathBuf>) -> Result<(), TagDatabaseError> {
        let path = path.into();
        self.run(move |db| db.load(path)).await
    }

    pub fn close(&self) {
        self.inner.lock().close();
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub async fn write_tag(&self, tag: Tag) -> Result<Tag, TagDatabaseError> {
        self.run(move |db| db.write_tag(tag)).await
    }

    pub async fn write_tags(&self, tags: Vec<Tag>) -> Result<DatabaseEditResult, TagDatabaseError> {
        self.run(move |db| db.write_tags(tags)).await
    }

    pub async fn delete_tag(
        &self,
        key: impl Into<TagKey>,
    ) -> Result<DeletedTag, TagDatabaseError> {
        let key = key.into();
        self.run(move |db| db.delete_tag(key)).await
    }

    pub async fn import(
        &self,
        hierarchy: ImportedHierarchy,
    ) -> Result<DatabaseEditResult, TagDatabaseError> {
        self.run(move |db| db.import(hierarchy)).await
    }

    pub async fn clear_tags(&self) -> Result<usize, TagDatabaseError> {
        self.run(|db| db.clear_tags()).await
    }

    pub async fn select_tag(&self, key: impl Into<TagKey>) -> Result<Option<Tag>, TagDatabaseError> {
        let key = key.into();
        self.run(move |db| db.select_tag(key)).await
    }

    pub async fn set_default_tag_bindings(
        &self,
        bindings: Vec<String>,
    ) -> Result<(), TagDatabaseError> {
        self.run(move |db| db.set_default_tag_bindings(bindings))
            .await
    }

    pub async fn get_setting(&self, key: impl Into<String>) -> Result<String, TagDatabaseError> {
        let key = key.into();
        self.run(move |db| db.settings().get(&key)).await
    }

    pub async fn update_setting(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), TagDatabaseError> {
        let (key, value) = (key.into(), value.into());
        self.run(move |db| db.settings().update(&key, &value)).await
    }

    // =========================================================================
    // Cache reads
    // =========================================================================

    pub fn tags(&self, top_level_only: bool) -> Vec<Tag> {
        self.inner
            .lock()
            .all_tags(top_level_only)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn tag(&self, key: impl Into<TagKey>) -> Option<Tag> {
        self.inner.lock().tag(key).cloned()
    }

    pub fn children(&self, key: impl Into<TagKey>) -> Vec<Tag> {
        self.inner
            .lock()
            .children(key)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn search(&self, query: &str, mode: SearchMode, include_aliases: bool) -> Vec<Tag> {
        let db = self.inner.lock();
        let found = if include_aliases {
            db.search_with_aliases(query, mode)
        } else {
            db.search(query, mode)
        };
        found.into_iter().cloned().collect()
    }

    pub fn export_template(&self) -> String {
        self.inner.lock().export_template()
    }

    pub fn new_tag(&self, name: impl Into<String>) -> Tag {
        self.inner.lock().new_tag(name)
    }

    pub fn is_initialised(&self) -> bool {
        self.inner.lock().is_initialised()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&DatabaseEvent) + Send + Sync + 'static,
    {
        self.inner.lock().subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.lock().unsubscribe(id)
    }
}

/// Exclusive access to a handle's database.
///
/// On drop, queued events are delivered with the lock released.
pub struct DatabaseGuard<'a> {
    guard: MutexGuard<'a, TagDatabase>,
}

impl<'a> DatabaseGuard<'a> {
    fn new(guard: MutexGuard<'a, TagDatabase>) -> Self {
        Self { guard }
    }
}

impl Deref for DatabaseGuard<'_> {
    type Target = TagDatabase;

    fn deref(&self) -> &TagDatabase {
        &self.guard
    }
}

impl DerefMut for DatabaseGuard<'_> {
    fn deref_mut(&mut self) -> &mut TagDatabase {
        &mut self.guard
    }
}

impl Drop for DatabaseGuard<'_> {
    fn drop(&mut self) {
        let pending = self.guard.events.take_pending();
        if !pending.is_empty() {
            MutexGuard::unlocked(&mut self.guard, || pending.deliver());
        }
    }
}
