//! Snapshot persistence.
//!
//! The whole task collection plus settings serialize to one opaque JSON
//! blob under a fixed key. Missing or corrupt data falls back to a small
//! set of seed tasks rather than failing: losing a snapshot must never
//! take the app down with it.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::task::{SortKey, Task, TaskDraft, TaskStore, UndoSlot};
use crate::utils::paths::{ensure_data_dir_exists, get_database_path};

/// Fixed storage key for the task collection blob.
pub const SNAPSHOT_KEY: &str = "tasks";

/// Everything that persists across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub sort_key: SortKey,
    /// Persisting the undo slot lets a CLI `undo` revert the previous
    /// invocation while the slot is still within its time window.
    #[serde(default)]
    pub undo: UndoSlot,
}

impl Snapshot {
    pub fn into_store(self) -> (TaskStore, SortKey) {
        (TaskStore::from_parts(self.tasks, self.undo), self.sort_key)
    }
}

pub fn open_default() -> Result<Connection> {
    ensure_data_dir_exists()?;
    let db_path = get_database_path()?;
    let conn = Connection::open(&db_path)
        .with_context(|| format!("Failed to open database at {db_path:?}"))?;
    Ok(conn)
}

pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            key TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub fn save_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<()> {
    let data = serde_json::to_string(snapshot).context("Failed to serialize snapshot")?;
    conn.execute(
        "INSERT OR REPLACE INTO snapshots (key, data, updated_at) VALUES (?1, ?2, ?3)",
        params![SNAPSHOT_KEY, data, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Load the snapshot, seeding defaults when the row is missing or the blob
/// does not deserialize.
pub fn load_snapshot(conn: &Connection) -> Result<Snapshot> {
    let row: Option<String> = conn
        .query_row(
            "SELECT data FROM snapshots WHERE key = ?1",
            params![SNAPSHOT_KEY],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    let Some(data) = row else {
        return Ok(seed_snapshot());
    };

    match serde_json::from_str(&data) {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => {
            warn!(error = %e, "snapshot blob is corrupt, falling back to seed tasks");
            Ok(seed_snapshot())
        }
    }
}

fn seed_snapshot() -> Snapshot {
    let mut store = TaskStore::new();
    let now = chrono::Local::now();
    for text in [
        "Try saying: add buy groceries for tomorrow",
        "Try saying: complete the first task",
        "Try saying: delete all completed tasks",
    ] {
        store.create(TaskDraft::new(text), now);
    }
    store.dismiss_undo();
    let (tasks, undo) = store.into_parts();
    Snapshot {
        tasks,
        sort_key: SortKey::default(),
        undo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_missing_row_seeds() {
        let conn = test_conn();
        let snapshot = load_snapshot(&conn).unwrap();
        assert_eq!(snapshot.tasks.len(), 3);
        assert_eq!(snapshot.sort_key, SortKey::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let conn = test_conn();

        let mut store = TaskStore::new();
        let task = store.create(TaskDraft::new("persist me"), Local::now());
        let (tasks, undo) = store.into_parts();
        let snapshot = Snapshot {
            tasks,
            sort_key: SortKey::DueDateAsc,
            undo,
        };
        save_snapshot(&conn, &snapshot).unwrap();

        let loaded = load_snapshot(&conn).unwrap();
        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].id, task.id);
        assert_eq!(loaded.tasks[0].text, "persist me");
        assert_eq!(loaded.sort_key, SortKey::DueDateAsc);
        assert_eq!(loaded.undo.kind(), Some("add"));
    }

    #[test]
    fn test_corrupt_blob_seeds() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO snapshots (key, data, updated_at) VALUES (?1, ?2, ?3)",
            params![SNAPSHOT_KEY, "{not json", Utc::now().to_rfc3339()],
        )
        .unwrap();

        let snapshot = load_snapshot(&conn).unwrap();
        assert_eq!(snapshot.tasks.len(), 3, "corrupt data falls back to seeds");
    }

    #[test]
    fn test_file_backed_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");
        {
            let conn = Connection::open(&path).unwrap();
            init_database(&conn).unwrap();
            save_snapshot(&conn, &Snapshot::default()).unwrap();
        }

        // Reopen: an existing (empty) snapshot row must NOT be replaced by
        // seed tasks.
        let conn = Connection::open(&path).unwrap();
        let loaded = load_snapshot(&conn).unwrap();
        assert!(loaded.tasks.is_empty());
    }

    #[test]
    fn test_save_overwrites() {
        let conn = test_conn();
        save_snapshot(&conn, &Snapshot::default()).unwrap();

        let mut store = TaskStore::new();
        store.create(TaskDraft::new("second write"), Local::now());
        let (tasks, undo) = store.into_parts();
        save_snapshot(&conn, &Snapshot { tasks, sort_key: SortKey::default(), undo }).unwrap();

        let loaded = load_snapshot(&conn).unwrap();
        assert_eq!(loaded.tasks.len(), 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
