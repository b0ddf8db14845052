mod reducer;
mod state;

pub use reducer::{reduce, Action};
pub use state::{
    CourseDetails, CourseDetailsPatch, CourseState, GradedKind, GradedSet, MarkMatrix, Outcome,
    Question, DEFAULT_OUTCOME_TARGET,
};

use crate::db;
use anyhow::Context;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Key the whole course snapshot is persisted under.
pub const STORE_KEY: &str = "course-storage";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} {1} not found")]
    NotFound(&'static str, u32),
    #[error("failed to persist course snapshot: {0:#}")]
    Persist(anyhow::Error),
}

pub trait SnapshotStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;
    fn save(&mut self, key: &str, value: &Value) -> anyhow::Result<()>;
}

/// Snapshots kept in the workspace database's `settings` table.
pub struct SqliteSnapshots {
    conn: Connection,
}

impl SqliteSnapshots {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(SqliteSnapshots {
            conn: db::open_db(workspace)?,
        })
    }
}

impl SnapshotStorage for SqliteSnapshots {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        db::settings_get_json(&self.conn, key)
    }

    fn save(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        db::settings_set_json(&self.conn, key, value)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemorySnapshots {
    entries: HashMap<String, Value>,
}

impl SnapshotStorage for MemorySnapshots {
    fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// Holds the current course snapshot. Every dispatch runs the reducer,
/// persists the result under [`STORE_KEY`] and only then swaps it in.
pub struct CourseStore<S: SnapshotStorage> {
    state: CourseState,
    storage: S,
}

impl<S: SnapshotStorage> CourseStore<S> {
    pub fn open(storage: S) -> anyhow::Result<Self> {
        let state = match storage.load(STORE_KEY)? {
            Some(v) => serde_json::from_value(v).context("stored course snapshot is invalid")?,
            None => CourseState::default(),
        };
        Ok(CourseStore { state, storage })
    }

    pub fn state(&self) -> &CourseState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn dispatch(&mut self, action: Action) -> Result<&CourseState, StoreError> {
        let next = reduce(&self.state, action)?;
        let snapshot = serde_json::to_value(&next)
            .context("failed to serialize course snapshot")
            .map_err(StoreError::Persist)?;
        self.storage
            .save(STORE_KEY, &snapshot)
            .map_err(StoreError::Persist)?;
        self.state = next;
        Ok(&self.state)
    }
}
