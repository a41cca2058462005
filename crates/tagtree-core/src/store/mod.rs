//! Hierarchy store
//!
//! SQLite-backed persistence for the tag hierarchy:
//! - `database`: lifecycle (create/load/migrate/close), cache-backed reads
//! - `write`: transactional writes, deletes and imports via [`WriteScope`]
//! - `settings`: the key/value settings facade
//! - `search`: normalised name/alias search
//! - `handle`: async wrapper for use from tokio
//!
//! # Example
//!
//! ```no_run
//! use tagtree_core::{Tag, TagDatabase, SearchMode};
//!
//! let mut db = TagDatabase::default();
//! db.create(":memory:", false, None)?;
//! db.write_tag(db.new_tag("Ambient"))?;
//! db.write_tag(Tag::child_of("Dark Ambient", ["Ambient"]))?;
//!
//! assert_eq!(db.search("dark", SearchMode::StartsWith).len(), 1);
//! # Ok::<(), tagtree_core::TagDatabaseError>(())
//! ```

mod cache;
mod config;
mod database;
mod error;
mod events;
mod handle;
pub mod schema;
mod search;
mod settings;
mod write;

pub use cache::TagCache;
pub use config::{JournalMode, StoreConfig};
pub use database::TagDatabase;
pub use error::TagDatabaseError;
pub use events::{
    DatabaseEditResult, DatabaseEvent, DeletedTag, EventBus, PendingEvents, SubscriptionId,
};
pub use handle::{DatabaseGuard, TagDatabaseHandle};
pub use search::SearchMode;
pub use settings::Settings;
pub use write::WriteScope;
