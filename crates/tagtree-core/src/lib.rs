//! Tagtree Core - Multi-parent tag hierarchies on SQLite
//!
//! This crate provides the core functionality for managing tag hierarchies:
//! - Tag entity model with self-validation
//! - Diacritic- and case-insensitive search normalisation
//! - Import/export of the indentation-based tag hierarchy template
//! - A transactional SQLite store with an in-memory cache and change events

pub mod codec;
pub mod model;
pub mod normalize;
pub mod store;

// Model re-exports
pub use model::{ImportedTag, Tag, TagId, TagKey, TagValidationError, TRANSIENT_ID};

// Codec re-exports
pub use codec::{
    Exporter, HierarchyFormat, ImportError, ImportedHierarchy, Importer, TemplateExporter,
    TemplateImporter,
};

// Store re-exports
pub use store::{
    DatabaseEditResult, DatabaseEvent, DatabaseGuard, DeletedTag, JournalMode, SearchMode,
    StoreConfig, SubscriptionId, TagDatabase, TagDatabaseError, TagDatabaseHandle, WriteScope,
};

pub use normalize::normalize_for_search;
