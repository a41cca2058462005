//! Change notifications
//!
//! Observers register a callback and receive every [`DatabaseEvent`]
//! synchronously, on the thread that made the change, after it is durable.
//!
//! A bus in deferred mode queues events instead; the owner drains them with
//! [`EventBus::take_pending`] and delivers them once it has released any lock
//! around the database, so a callback may read the database again.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{Tag, TagId};

/// Handle returned by [`EventBus::subscribe`].
pub type SubscriptionId = u64;

/// A tag that no longer exists. The tag itself is gone, so only its
/// identity is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedTag {
    pub id: TagId,
    pub name: String,
}

/// Net effect of one committed write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseEditResult {
    pub added: Vec<Tag>,
    pub updated: Vec<Tag>,
    pub deleted: Vec<DeletedTag>,
}

impl DatabaseEditResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Record a written tag, classified by whether it existed before the
    /// transaction. Repeated writes of one tag keep only the last version.
    pub(crate) fn record_write(&mut self, tag: Tag, existed_before: bool) {
        if let Some(slot) = self.added.iter_mut().find(|t| t.id == tag.id) {
            *slot = tag;
        } else if let Some(slot) = self.updated.iter_mut().find(|t| t.id == tag.id) {
            *slot = tag;
        } else if existed_before {
            self.updated.push(tag);
        } else {
            self.added.push(tag);
        }
    }

    pub(crate) fn record_delete(&mut self, deleted: DeletedTag) {
        self.added.retain(|t| t.id != deleted.id);
        self.updated.retain(|t| t.id != deleted.id);
        self.deleted.push(deleted);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEvent {
    /// Create or load finished; the cache is fully populated.
    Initialised,
    /// A transaction committed tag changes.
    TagsWritten(DatabaseEditResult),
    /// One tag was deleted.
    TagDeleted { id: TagId, name: String },
}

type Callback = Arc<dyn Fn(&DatabaseEvent) + Send + Sync>;

/// Callback registry owned by a database.
#[derive(Default)]
pub struct EventBus {
    next_id: SubscriptionId,
    subscribers: Vec<(SubscriptionId, Callback)>,
    deferred: bool,
    pending: Vec<DatabaseEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&DatabaseEvent) + Send + Sync + 'static,
    {
        self.next_id += 1;
        self.subscribers.push((self.next_id, Arc::new(callback)));
        self.next_id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Queue events instead of delivering them as they are published.
    pub fn set_deferred(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn publish(&mut self, event: DatabaseEvent) {
        if self.deferred {
            self.pending.push(event);
            return;
        }
        for (_, callback) in &self.subscribers {
            callback(&event);
        }
    }

    /// Drain the queued events together with the current subscribers.
    pub fn take_pending(&mut self) -> PendingEvents {
        if self.pending.is_empty() {
            return PendingEvents::default();
        }
        PendingEvents {
            events: std::mem::take(&mut self.pending),
            subscribers: self
                .subscribers
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("deferred", &self.deferred)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Events drained from a deferred bus, ready to deliver.
#[derive(Default)]
pub struct PendingEvents {
    events: Vec<DatabaseEvent>,
    subscribers: Vec<Callback>,
}

impl PendingEvents {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn deliver(self) {
        for event in &self.events {
            for callback in &self.subscribers {
                callback(event);
            }
        }
    }
}
