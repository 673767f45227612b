use super::kv_store::KeyValueStore;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

pub const DB_FILE_NAME: &str = "album.db";

/// V 0
const KV_ENTRY_TABLE_V_0: Table = Table {
    name: "kv_entry",
    columns: &[
        sqlite_column!(
            "key",
            SqlType::Text,
            is_primary_key = true,
            non_null = true
        ),
        sqlite_column!("value", SqlType::Text, non_null = true),
        sqlite_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[KV_ENTRY_TABLE_V_0],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteKeyValueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteKeyValueStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, VERSIONED_SCHEMAS)?;
        Ok(SqliteKeyValueStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Looks for an album database in the working directory and its ancestors.
    pub fn infer_path() -> Option<PathBuf> {
        let mut current_dir = std::env::current_dir().ok()?;
        loop {
            let candidate = current_dir.join(DB_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !current_dir.pop() {
                return None;
            }
        }
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT value FROM {} WHERE key = ?1",
                KV_ENTRY_TABLE_V_0.name
            ),
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read entry {}", key))
    }

    fn put_all(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                &format!(
                    "INSERT INTO {} (key, value, updated) VALUES (?1, ?2, {})
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated = excluded.updated",
                    KV_ENTRY_TABLE_V_0.name, DEFAULT_TIMESTAMP
                ),
                params![key, value],
            )
            .with_context(|| format!("Failed to write entry {}", key))?;
        }
        tx.commit().context("Failed to commit entries")
    }
}
