//! SQLite schema for tag hierarchy databases
//!
//! One file holds one hierarchy:
//! - `tag`: one row per tag, list columns flattened with `;`
//! - `tag_parent_link`: many-to-many parent edges, keyed by tag id
//! - `settings`: flat key/value pairs, two of which are required

/// Current schema version, stored in the `version` setting.
///
/// v2 adds `date_created`/`date_modified` to `tag` and drops the `alias` table.
pub const LATEST_VERSION: i64 = 2;

/// File extension for tag hierarchy databases, without the leading dot.
pub const DATABASE_EXTENSION: &str = "thdb";

/// Path value that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Display name for in-memory databases.
pub const IN_MEMORY_NAME: &str = "(temporary in-memory database)";

/// Setting key holding the schema version.
pub const VERSION_KEY: &str = "version";

/// Setting key holding the `;`-joined default tag bindings.
pub const DEFAULT_TAG_BIND_KEY: &str = "default_tag_bind";

/// Settings that can be neither deleted nor renamed.
pub const REQUIRED_KEYS: [&str; 2] = [VERSION_KEY, DEFAULT_TAG_BIND_KEY];

/// Tables a valid database may contain. `alias` only exists before v2.
pub const ALLOWED_TABLES: [&str; 4] = ["tag", "tag_parent_link", "alias", "settings"];

/// SQL to create the tag table
pub const SCHEMA_CREATE_TAG: &str = r#"
CREATE TABLE IF NOT EXISTS tag (
    id INTEGER NOT NULL,
    name TEXT NOT NULL UNIQUE,
    notes TEXT DEFAULT '',
    top_level INTEGER NOT NULL DEFAULT 0,

    -- ';'-joined binding labels, in order
    tags_to_bind TEXT,

    -- ';'-joined aliases
    also_known_as TEXT DEFAULT '',

    -- v2
    date_created DATETIME DEFAULT NULL,
    date_modified DATETIME DEFAULT NULL,

    PRIMARY KEY(id AUTOINCREMENT)
)
"#;

/// SQL to create the parent link table
///
/// A row reads "`target_tag_id` is a child of `parent_tag_id`".
pub const SCHEMA_CREATE_PARENT_LINK: &str = r#"
CREATE TABLE IF NOT EXISTS tag_parent_link (
    target_tag_id INT NOT NULL,
    parent_tag_id INT NOT NULL CHECK(parent_tag_id != target_tag_id),
    FOREIGN KEY(parent_tag_id) REFERENCES tag(id) ON DELETE CASCADE,
    FOREIGN KEY(target_tag_id) REFERENCES tag(id) ON DELETE CASCADE
)
"#;

/// SQL to create the settings table
pub const SCHEMA_CREATE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL
)
"#;

/// Triggers guarding the required settings at the storage layer
pub const SCHEMA_CREATE_TRIGGERS: &str = r#"
CREATE TRIGGER IF NOT EXISTS DoNotChangeRequiredKeys
BEFORE UPDATE ON settings
FOR EACH ROW
WHEN OLD.key IN ('version', 'default_tag_bind') AND OLD.key != NEW.key
BEGIN
    SELECT RAISE(ABORT, 'CANNOT_CHANGE_REQUIRED_KEY');
END;

CREATE TRIGGER IF NOT EXISTS DoNotDeleteRequired
BEFORE DELETE ON settings
FOR EACH ROW
WHEN OLD.key IN ('version', 'default_tag_bind')
BEGIN
    SELECT RAISE(ABORT, 'CANNOT_DELETE_REQUIRED_KEY');
END;
"#;

/// SQL to create indexes for parent/child lookups
pub const SCHEMA_CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_parent_link_target ON tag_parent_link(target_tag_id);
CREATE INDEX IF NOT EXISTS idx_parent_link_parent ON tag_parent_link(parent_tag_id);
"#;

/// Migration from v1: timestamp columns, backfilled modification date, no alias table
pub const MIGRATE_V1_TO_V2: &str = r#"
ALTER TABLE tag ADD COLUMN date_created DATETIME DEFAULT NULL;
ALTER TABLE tag ADD COLUMN date_modified DATETIME DEFAULT NULL;
UPDATE tag SET date_modified = CURRENT_TIMESTAMP;
DROP TABLE IF EXISTS alias;
"#;

/// Column names for tag queries (in order for row mapping)
pub const TAG_COLUMNS: &str =
    "id, name, notes, top_level, tags_to_bind, also_known_as, date_created, date_modified";

/// Recursive query: is `?2` a descendant of `?1`?
pub const QUERY_IS_DESCENDANT: &str = r#"
WITH RECURSIVE descendants(id) AS (
    SELECT target_tag_id FROM tag_parent_link WHERE parent_tag_id = ?1
    UNION
    SELECT l.target_tag_id
    FROM tag_parent_link l
    JOIN descendants d ON l.parent_tag_id = d.id
)
SELECT 1 FROM descendants WHERE id = ?2 LIMIT 1
"#;

/// Schema of a version 1 database, as older releases wrote it.
#[cfg(test)]
pub const SCHEMA_V1: &str = r#"
CREATE TABLE tag (
    id INTEGER NOT NULL,
    name TEXT NOT NULL UNIQUE,
    notes TEXT DEFAULT '',
    top_level INTEGER NOT NULL DEFAULT 0,
    tags_to_bind TEXT,
    also_known_as TEXT DEFAULT '',
    PRIMARY KEY(id AUTOINCREMENT)
);

CREATE TABLE alias (
    id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    name TEXT,
    PRIMARY KEY(id AUTOINCREMENT),
    FOREIGN KEY(tag_id) REFERENCES tag(id) ON DELETE CASCADE
);

CREATE TABLE tag_parent_link (
    target_tag_id INT NOT NULL,
    parent_tag_id INT NOT NULL CHECK(parent_tag_id != target_tag_id),
    FOREIGN KEY(parent_tag_id) REFERENCES tag(id) ON DELETE CASCADE,
    FOREIGN KEY(target_tag_id) REFERENCES tag(id) ON DELETE CASCADE
);

CREATE TABLE settings (
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL
);

INSERT INTO settings (key, value) VALUES ('version', '1');
INSERT INTO settings (key, value) VALUES ('default_tag_bind', 'genre');
"#;
