//! Key/value settings stored alongside the hierarchy

use std::collections::BTreeMap;

use rusqlite::{params, Result as SqliteResult};
use tracing::debug;

use super::database::{read_setting, TagDatabase};
use super::error::TagDatabaseError;
use super::schema::{DEFAULT_TAG_BIND_KEY, REQUIRED_KEYS};
use crate::model::{join_list, split_list};

/// Settings facade borrowed from a [`TagDatabase`].
///
/// `version` and `default_tag_bind` are required: they can be updated but
/// never deleted. Updating `default_tag_bind` also updates the database's
/// default bindings.
pub struct Settings<'a> {
    db: &'a mut TagDatabase,
}

impl TagDatabase {
    pub fn settings(&mut self) -> Settings<'_> {
        Settings { db: self }
    }
}

impl Settings<'_> {
    pub fn is_required(key: &str) -> bool {
        REQUIRED_KEYS.contains(&key)
    }

    pub fn exists(&self, key: &str) -> Result<bool, TagDatabaseError> {
        let conn = self.db.ensure_initialised()?;
        Ok(read_setting(conn, key)?.is_some())
    }

    pub fn create(&mut self, key: &str, value: &str) -> Result<(), TagDatabaseError> {
        if self.exists(key)? {
            return Err(TagDatabaseError::setting_exists(key));
        }
        let conn = self.db.ensure_initialised()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        debug!(key, value, "Setting created");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<String, TagDatabaseError> {
        let conn = self.db.ensure_initialised()?;
        read_setting(conn, key)?.ok_or_else(|| TagDatabaseError::setting_not_found(key))
    }

    pub fn get_all(&self) -> Result<BTreeMap<String, String>, TagDatabaseError> {
        let conn = self.db.ensure_initialised()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let settings = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<BTreeMap<String, String>>>()?;
        Ok(settings)
    }

    pub fn update(&mut self, key: &str, value: &str) -> Result<(), TagDatabaseError> {
        if key == DEFAULT_TAG_BIND_KEY {
            return self.db.set_default_tag_bindings(split_list(value));
        }

        let conn = self.db.ensure_initialised()?;
        let changed = conn.execute(
            "UPDATE settings SET value = ?1 WHERE key = ?2",
            params![value, key],
        )?;
        if changed == 0 {
            return Err(TagDatabaseError::setting_not_found(key));
        }
        debug!(key, value, "Setting updated");
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<(), TagDatabaseError> {
        if Self::is_required(key) {
            return Err(TagDatabaseError::setting_required(key));
        }

        let conn = self.db.ensure_initialised()?;
        let changed = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        if changed == 0 {
            return Err(TagDatabaseError::setting_not_found(key));
        }
        debug!(key, "Setting deleted");
        Ok(())
    }

    /// Restore `default_tag_bind` to the bindings in the store's config.
    pub fn reset_defaults(&mut self) -> Result<(), TagDatabaseError> {
        let defaults = self.db.config().default_bindings.clone();
        debug!(defaults = %join_list(&defaults), "Resetting default settings");
        self.db.set_default_tag_bindings(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::{IN_MEMORY_PATH, VERSION_KEY};
    use crate::store::StoreConfig;

    fn memory_db() -> TagDatabase {
        let mut db = TagDatabase::new(StoreConfig::default().with_default_bindings(["genre", "style"]));
        db.create(IN_MEMORY_PATH, false, None).unwrap();
        db
    }

    #[test]
    fn test_required_settings_seeded() {
        let mut db = memory_db();
        let all = db.settings().get_all().unwrap();
        assert_eq!(all.get(VERSION_KEY).map(String::as_str), Some("2"));
        assert_eq!(
            all.get(DEFAULT_TAG_BIND_KEY).map(String::as_str),
            Some("genre;style")
        );
    }

    #[test]
    fn test_create_get_update_delete() {
        let mut db = memory_db();
        let mut settings = db.settings();

        settings.create("theme", "dark").unwrap();
        assert_eq!(settings.get("theme").unwrap(), "dark");
        assert!(matches!(
            settings.create("theme", "light"),
            Err(TagDatabaseError::SettingExists { .. })
        ));

        settings.update("theme", "light").unwrap();
        assert_eq!(settings.get("theme").unwrap(), "light");

        settings.delete("theme").unwrap();
        assert!(settings.get("theme").unwrap_err().is_not_found());
        assert!(settings.delete("theme").unwrap_err().is_not_found());
        assert!(settings.update("theme", "x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_required_keys_cannot_be_deleted() {
        let mut db = memory_db();
        for key in REQUIRED_KEYS {
            assert!(matches!(
                db.settings().delete(key),
                Err(TagDatabaseError::SettingRequired { .. })
            ));
        }
    }

    #[test]
    fn test_trigger_blocks_renaming_required_key() {
        let db = memory_db();
        let err = db
            .connection()
            .unwrap()
            .execute(
                "UPDATE settings SET key = 'renamed' WHERE key = 'version'",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("CANNOT_CHANGE_REQUIRED_KEY"));
    }

    #[test]
    fn test_update_default_bindings_refreshes_store() {
        let mut db = memory_db();
        db.settings().update(DEFAULT_TAG_BIND_KEY, "mood; genre").unwrap();
        assert_eq!(db.default_tag_bindings(), ["mood", "genre"]);

        db.settings().reset_defaults().unwrap();
        assert_eq!(db.default_tag_bindings(), ["genre", "style"]);
        assert_eq!(db.settings().get(DEFAULT_TAG_BIND_KEY).unwrap(), "genre;style");
    }
}
