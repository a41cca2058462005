//! Tag database lifecycle and reads
//!
//! A [`TagDatabase`] starts uninitialised; [`TagDatabase::create`] or
//! [`TagDatabase::load`] opens a connection, sets up or validates the schema
//! and fills the cache. Reads are served from the cache; writes go through
//! [`TagDatabase::transaction`] (see `write.rs`).

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Result as SqliteResult, Row};
use tracing::{debug, info, warn};

use super::cache::TagCache;
use super::config::StoreConfig;
use super::error::TagDatabaseError;
use super::events::{DatabaseEvent, EventBus, SubscriptionId};
use super::schema::{
    ALLOWED_TABLES, DATABASE_EXTENSION, DEFAULT_TAG_BIND_KEY, IN_MEMORY_NAME, IN_MEMORY_PATH,
    LATEST_VERSION, MIGRATE_V1_TO_V2, SCHEMA_CREATE_INDEXES, SCHEMA_CREATE_PARENT_LINK,
    SCHEMA_CREATE_SETTINGS, SCHEMA_CREATE_TAG, SCHEMA_CREATE_TRIGGERS, TAG_COLUMNS, VERSION_KEY,
};
use crate::codec::{Exporter, ImportedHierarchy, TemplateExporter};
use crate::model::{join_list, split_list, Tag, TagId, TagKey};

/// Where a database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Memory,
    File(PathBuf),
}

/// A multi-parent tag hierarchy persisted in SQLite.
#[derive(Debug)]
pub struct TagDatabase {
    pub(super) conn: Option<Connection>,
    pub(super) cache: TagCache,
    pub(super) events: EventBus,
    pub(super) default_bindings: Vec<String>,
    config: StoreConfig,
    location: Option<Location>,
    version: i64,
    initialised: bool,
}

impl Default for TagDatabase {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl TagDatabase {
    /// Create an uninitialised database handle.
    ///
    /// Subscribe to events here, before `create`/`load`, to receive
    /// [`DatabaseEvent::Initialised`].
    pub fn new(config: StoreConfig) -> Self {
        Self {
            conn: None,
            cache: TagCache::new(),
            events: EventBus::new(),
            default_bindings: config.default_bindings.clone(),
            config,
            location: None,
            version: LATEST_VERSION,
            initialised: false,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a new database file (or `:memory:`), optionally seeded from an
    /// imported hierarchy.
    ///
    /// A seed that fails to import leaves the database closed.
    pub fn create(
        &mut self,
        path: impl AsRef<Path>,
        overwrite: bool,
        seed: Option<ImportedHierarchy>,
    ) -> Result<(), TagDatabaseError> {
        let path = path.as_ref();
        let location = Self::validate_path(path, false)?;
        if let Location::File(file) = &location {
            if file.exists() && !overwrite {
                return Err(TagDatabaseError::file_exists(file));
            }
        }
        self.close();

        let conn = match &location {
            Location::Memory => Connection::open_in_memory()?,
            Location::File(file) => {
                if file.exists() {
                    std::fs::remove_file(file)?;
                }
                if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Connection::open(file)?
            }
        };

        Self::configure_connection(&conn, &self.config)?;
        Self::create_schema(&conn, &self.config.default_bindings)?;
        info!(path = %path.display(), "Created tag database");

        self.attach(conn, location);
        self.finish_initialisation(seed)
    }

    /// Open an existing database, validating and migrating it as needed.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), TagDatabaseError> {
        let path = path.as_ref();
        let location = Self::validate_path(path, true)?;
        self.close();

        let conn = match &location {
            Location::Memory => Connection::open_in_memory()?,
            Location::File(file) => Connection::open(file)?,
        };
        debug!(path = %path.display(), "Connection opened");

        Self::validate_is_sqlite(&conn, path)?;
        Self::configure_connection(&conn, &self.config)?;
        Self::validate_structure(&conn)?;

        let version = read_version(&conn)?;
        if version > LATEST_VERSION {
            return Err(TagDatabaseError::UnsupportedVersion {
                found: version,
                latest: LATEST_VERSION,
            });
        }
        if version < LATEST_VERSION {
            Self::migrate(&conn, version)?;
        }

        info!(path = %path.display(), version, "Loaded tag database");
        self.attach(conn, location);
        self.finish_initialisation(None)
    }

    /// Release the connection. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!(error = %e, "Error while closing tag database");
            }
            info!(name = %self.name(), "Closed tag database");
        }
        self.initialised = false;
        self.cache.clear();
    }

    fn attach(&mut self, conn: Connection, location: Location) {
        self.conn = Some(conn);
        self.location = Some(location);
    }

    fn finish_initialisation(
        &mut self,
        seed: Option<ImportedHierarchy>,
    ) -> Result<(), TagDatabaseError> {
        let result = self.populate(seed);
        if result.is_err() {
            self.close();
            return result;
        }

        self.initialised = true;
        debug!(
            name = %self.name(),
            version = self.version,
            tags = self.cache.len(),
            default_bindings = %join_list(&self.default_bindings),
            "Tag database initialised"
        );
        self.events.publish(DatabaseEvent::Initialised);
        Ok(())
    }

    fn populate(&mut self, seed: Option<ImportedHierarchy>) -> Result<(), TagDatabaseError> {
        let conn = self.connection()?;
        let version = read_version(conn)?;
        let bindings = read_setting(conn, DEFAULT_TAG_BIND_KEY)?
            .ok_or_else(|| TagDatabaseError::setting_not_found(DEFAULT_TAG_BIND_KEY))?;
        let tags = load_all_tags(conn)?;

        self.version = version;
        self.default_bindings = split_list(&bindings);
        self.cache = TagCache::from_tags(tags);

        if let Some(hierarchy) = seed {
            self.import(hierarchy)?;
        }
        Ok(())
    }

    fn validate_path(path: &Path, load: bool) -> Result<Location, TagDatabaseError> {
        if path.as_os_str() == IN_MEMORY_PATH {
            return Ok(Location::Memory);
        }
        if path.as_os_str().is_empty() {
            return Err(TagDatabaseError::EmptyPath);
        }
        if path.extension().and_then(|e| e.to_str()) != Some(DATABASE_EXTENSION) {
            return Err(TagDatabaseError::invalid_extension(path));
        }
        if load && !path.is_file() {
            return Err(TagDatabaseError::file_not_found(path));
        }
        Ok(Location::File(path.to_path_buf()))
    }

    /// Configure connection pragmas
    fn configure_connection(conn: &Connection, config: &StoreConfig) -> SqliteResult<()> {
        conn.pragma_update(None, "journal_mode", config.journal_mode.as_pragma())?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    fn create_schema(conn: &Connection, default_bindings: &[String]) -> SqliteResult<()> {
        let tx = conn.unchecked_transaction()?;
        tx.execute(SCHEMA_CREATE_TAG, [])?;
        tx.execute(SCHEMA_CREATE_PARENT_LINK, [])?;
        tx.execute(SCHEMA_CREATE_SETTINGS, [])?;
        tx.execute_batch(SCHEMA_CREATE_INDEXES)?;
        tx.execute_batch(SCHEMA_CREATE_TRIGGERS)?;
        tx.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2), (?3, ?4)",
            params![
                VERSION_KEY,
                LATEST_VERSION.to_string(),
                DEFAULT_TAG_BIND_KEY,
                join_list(default_bindings)
            ],
        )?;
        tx.commit()
    }

    /// Reject files SQLite cannot read, and empty files.
    fn validate_is_sqlite(conn: &Connection, path: &Path) -> Result<(), TagDatabaseError> {
        match conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0)) {
            Ok(0) => Err(TagDatabaseError::not_sqlite(path)),
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::NotADatabase => {
                Err(TagDatabaseError::not_sqlite(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reject SQLite files holding anything but a tag hierarchy.
    fn validate_structure(conn: &Connection) -> Result<(), TagDatabaseError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name != 'sqlite_sequence'
             ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;

        if let Some(table) = tables
            .iter()
            .find(|t| !ALLOWED_TABLES.contains(&t.as_str()))
        {
            return Err(TagDatabaseError::unexpected_schema(table.as_str()));
        }
        for required in ["tag", "tag_parent_link", "settings"] {
            if !tables.iter().any(|t| t == required) {
                return Err(TagDatabaseError::MissingTable {
                    table: required.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Bring an older schema up to [`LATEST_VERSION`] in one transaction.
    fn migrate(conn: &Connection, from: i64) -> Result<(), TagDatabaseError> {
        let tx = conn.unchecked_transaction()?;
        if from < 2 {
            tx.execute_batch(MIGRATE_V1_TO_V2)?;
        }
        tx.execute_batch(SCHEMA_CREATE_INDEXES)?;
        tx.execute_batch(SCHEMA_CREATE_TRIGGERS)?;
        tx.execute(
            "UPDATE settings SET value = ?1 WHERE key = ?2",
            params![LATEST_VERSION.to_string(), VERSION_KEY],
        )?;
        tx.commit()?;

        info!(from, to = LATEST_VERSION, "Migrated tag database");
        Ok(())
    }

    pub(super) fn connection(&self) -> Result<&Connection, TagDatabaseError> {
        self.conn.as_ref().ok_or(TagDatabaseError::NotInitialised)
    }

    pub(super) fn ensure_initialised(&self) -> Result<&Connection, TagDatabaseError> {
        if !self.initialised {
            return Err(TagDatabaseError::NotInitialised);
        }
        self.connection()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// File stem of the database, or a fixed label for in-memory databases.
    pub fn name(&self) -> String {
        match &self.location {
            Some(Location::File(path)) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Some(Location::Memory) => IN_MEMORY_NAME.to_string(),
            None => String::new(),
        }
    }

    /// Path of the database file; `None` when in memory or not opened.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Some(Location::File(path)) => Some(path),
            _ => None,
        }
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn tag_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of parent links across all tags.
    pub fn relationship_count(&self) -> usize {
        self.cache.relationship_count()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&DatabaseEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All cached tags, in creation order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.cache.iter()
    }

    pub fn all_tags(&self, top_level_only: bool) -> Vec<&Tag> {
        self.cache
            .iter()
            .filter(|t| !top_level_only || t.is_top_level)
            .collect()
    }

    /// Look up a cached tag by id or name.
    pub fn tag(&self, key: impl Into<TagKey>) -> Option<&Tag> {
        self.cache.get_by_key(&key.into())
    }

    /// Tags listing the given tag as a parent. Unknown keys have no children.
    pub fn children(&self, key: impl Into<TagKey>) -> Vec<&Tag> {
        match self.cache.get_by_key(&key.into()) {
            Some(tag) => self.cache.children_of(tag.id),
            None => Vec::new(),
        }
    }

    /// Fetch one tag and its parents straight from storage, bypassing the cache.
    pub fn select_tag(&self, key: impl Into<TagKey>) -> Result<Option<Tag>, TagDatabaseError> {
        let conn = self.ensure_initialised()?;
        Ok(select_tag(conn, &key.into())?)
    }

    // =========================================================================
    // Default bindings
    // =========================================================================

    pub fn default_tag_bindings(&self) -> &[String] {
        &self.default_bindings
    }

    /// Replace the default bindings and persist them to `default_tag_bind`.
    pub fn set_default_tag_bindings<I, S>(&mut self, bindings: I) -> Result<(), TagDatabaseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bindings: Vec<String> = bindings.into_iter().map(Into::into).collect();
        let conn = self.ensure_initialised()?;
        conn.execute(
            "UPDATE settings SET value = ?1 WHERE key = ?2",
            params![join_list(&bindings), DEFAULT_TAG_BIND_KEY],
        )?;
        debug!(bindings = %join_list(&bindings), "Default tag bindings updated");
        self.default_bindings = bindings;
        Ok(())
    }

    /// A transient top-level tag carrying the default bindings.
    pub fn new_tag(&self, name: impl Into<String>) -> Tag {
        Tag::top_level(name).with_bindings(self.default_bindings.iter().cloned())
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Serialise the whole hierarchy as a tag hierarchy template.
    pub fn export_template(&self) -> String {
        self.export_with(&TemplateExporter::new())
    }

    pub fn export_with(&self, exporter: &dyn Exporter) -> String {
        let tags: Vec<Tag> = self.cache.iter().cloned().collect();
        exporter.export(&tags)
    }
}

impl Drop for TagDatabase {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Row helpers shared with the write path
// =============================================================================

/// Map a row selected with [`TAG_COLUMNS`] to a tag without parents.
pub(super) fn row_to_tag(row: &Row<'_>) -> SqliteResult<Tag> {
    let notes: Option<String> = row.get(2)?;
    let bindings: Option<String> = row.get(4)?;
    let aliases: Option<String> = row.get(5)?;

    let mut tag = Tag::top_level(row.get::<_, String>(1)?)
        .with_notes(notes.unwrap_or_default())
        .with_bindings(split_list(bindings.as_deref().unwrap_or_default()))
        .with_aliases(split_list(aliases.as_deref().unwrap_or_default()));
    tag.id = row.get(0)?;
    tag.is_top_level = row.get(3)?;
    tag.date_created = row.get(6)?;
    tag.date_modified = row.get(7)?;
    Ok(tag)
}

/// Load every tag with its parent ids.
pub(super) fn load_all_tags(conn: &Connection) -> SqliteResult<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM tag ORDER BY id", TAG_COLUMNS))?;
    let mut tags = stmt
        .query_map([], row_to_tag)?
        .collect::<SqliteResult<Vec<_>>>()?;

    let mut stmt = conn.prepare("SELECT target_tag_id, parent_tag_id FROM tag_parent_link")?;
    let mut parents: HashMap<TagId, BTreeSet<TagId>> = HashMap::new();
    for link in stmt.query_map([], |row| Ok((row.get::<_, TagId>(0)?, row.get::<_, TagId>(1)?)))? {
        let (target, parent) = link?;
        parents.entry(target).or_default().insert(parent);
    }

    for tag in &mut tags {
        if let Some(ids) = parents.remove(&tag.id) {
            tag.parent_ids = ids;
        }
    }
    Ok(tags)
}

/// Fetch one tag by id or name, with parent ids and names.
pub(super) fn select_tag(conn: &Connection, key: &TagKey) -> SqliteResult<Option<Tag>> {
    let tag = match key {
        TagKey::Id(id) => conn
            .query_row(
                &format!("SELECT {} FROM tag WHERE id = ?1", TAG_COLUMNS),
                params![id],
                row_to_tag,
            )
            .optional()?,
        TagKey::Name(name) => conn
            .query_row(
                &format!("SELECT {} FROM tag WHERE name = ?1", TAG_COLUMNS),
                params![name],
                row_to_tag,
            )
            .optional()?,
    };
    let Some(mut tag) = tag else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT p.id, p.name
         FROM tag_parent_link l
         JOIN tag p ON p.id = l.parent_tag_id
         WHERE l.target_tag_id = ?1",
    )?;
    for parent in stmt.query_map(params![tag.id], |row| {
        Ok((row.get::<_, TagId>(0)?, row.get::<_, String>(1)?))
    })? {
        let (id, name) = parent?;
        tag.parent_ids.insert(id);
        tag.parent_names.insert(name);
    }
    Ok(Some(tag))
}

pub(super) fn read_setting(conn: &Connection, key: &str) -> SqliteResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

fn read_version(conn: &Connection) -> Result<i64, TagDatabaseError> {
    let value = read_setting(conn, VERSION_KEY)?
        .ok_or_else(|| TagDatabaseError::setting_not_found(VERSION_KEY))?;
    value
        .trim()
        .parse()
        .map_err(|_| TagDatabaseError::InvalidSetting {
            key: VERSION_KEY.to_string(),
            value,
        })
}
