use crate::infrastructure::error::InfraError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub const TASKS_KEY: &str = "timeblocks-tasks";
pub const CALENDAR_SETTINGS_KEY: &str = "timeblocks-calendar-settings";

const LEGACY_KEY_PAIRS: [(&str, &str); 6] = [
    ("planner-tasks", TASKS_KEY),
    ("planner-calendar-settings", CALENDAR_SETTINGS_KEY),
    ("planner-view-visibility", "timeblocks-view-visibility"),
    ("planner:notes", "timeblocks-notes"),
    ("planner-theme", "timeblocks-theme"),
    ("planner-mode", "timeblocks-mode"),
];

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// String documents addressed by key, the shape the planner persists in.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
    fn remove(&self, key: &str) -> Result<(), InfraError>;
    fn keys(&self) -> Result<Vec<String>, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare("SELECT key FROM kv ORDER BY key")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryKeyValueStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, InfraError> {
        self.entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("key-value lock poisoned: {error}")))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, InfraError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

/// Copies each legacy `planner-*` key to its `timeblocks-*` name when the new key is absent.
/// Returns the legacy keys that were moved.
pub fn migrate_legacy_keys(store: &dyn KeyValueStore) -> Result<Vec<String>, InfraError> {
    let mut migrated = Vec::new();
    for (old_key, new_key) in LEGACY_KEY_PAIRS {
        let Some(value) = store.get(old_key)? else {
            continue;
        };
        if store.get(new_key)?.is_some() {
            continue;
        }
        store.set(new_key, &value)?;
        store.remove(old_key)?;
        info!(from = old_key, to = new_key, "migrated legacy storage key");
        migrated.push(old_key.to_string());
    }
    Ok(migrated)
}
