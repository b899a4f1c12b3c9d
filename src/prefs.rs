use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::app_dirs::AppDirs;
use crate::error::Result;

/// Opaque key -> string storage
#[derive(Debug)]
pub struct PrefsDb {
    conn: Connection,
}

impl PrefsDb {
    /// Open the store at the default state path, creating it if needed
    pub fn open() -> Result<Self> {
        let path = AppDirs::state_db_path().unwrap_or_else(|| PathBuf::from("roundclock_prefs.db"));
        Self::open_at(path)
    }

    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening preferences store");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(PrefsDb { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO preferences (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Returns whether a value was present
    pub fn remove(&self, key: &str) -> Result<bool> {
        let n = self
            .conn
            .execute("DELETE FROM preferences WHERE key = ?1", [key])?;
        Ok(n > 0)
    }

    pub fn meta_tags_hidden(&self, map_id: &str) -> Result<bool> {
        Ok(self.get(&meta_tags_key(map_id))?.as_deref() == Some("true"))
    }

    /// Flip the per-map meta tag toggle and return the new state
    pub fn toggle_meta_tags(&self, map_id: &str) -> Result<bool> {
        let hidden = !self.meta_tags_hidden(map_id)?;
        self.set(&meta_tags_key(map_id), &hidden.to_string())?;
        Ok(hidden)
    }
}

pub fn meta_tags_key(map_id: &str) -> String {
    format!("mma-hide-meta-tags-{map_id}")
}
