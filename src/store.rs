// Persistence backends for the task list

use crate::error::TrackerError;
use crate::jsonl;
use crate::models::{Task, now_ms};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Load/save collaborator for the tracker
///
/// `save` always receives the full list and replaces any prior snapshot.
pub trait TaskStore {
    /// Read persisted tasks
    ///
    /// Returns an empty list when nothing is stored or the payload is malformed.
    /// Only genuine I/O failures are errors.
    fn load(&self) -> Result<Vec<Task>>;

    fn save(&mut self, tasks: &[Task]) -> Result<()>;
}

impl<S: TaskStore + ?Sized> TaskStore for Box<S> {
    fn load(&self) -> Result<Vec<Task>> {
        (**self).load()
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        (**self).save(tasks)
    }
}

/// Which on-disk backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Jsonl,
    Sqlite,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Jsonl => "jsonl",
            Backend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Backend::Jsonl),
            "sqlite" => Ok(Backend::Sqlite),
            _ => Err(TrackerError::InvalidMode {
                kind: "backend",
                value: s.to_string(),
            }),
        }
    }
}

/// Open the configured backend in `dir`
pub fn open_store<P: AsRef<Path>>(backend: Backend, dir: P) -> Result<Box<dyn TaskStore>> {
    let dir = dir.as_ref();
    info!(backend = %backend, dir = ?dir, "Opening task store");
    Ok(match backend {
        Backend::Jsonl => Box::new(JsonlStore::open(dir)?),
        Backend::Sqlite => Box::new(SqliteStore::open(dir)?),
    })
}

// ============================================================================
// In-memory
// ============================================================================

/// Keeps the last saved snapshot in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tasks: Vec<Task>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks, saves: 0 }
    }

    /// Last saved snapshot
    pub fn snapshot(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of `save` calls so far
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.clone())
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        self.tasks = tasks.to_vec();
        self.saves += 1;
        Ok(())
    }
}

// ============================================================================
// JSONL snapshot
// ============================================================================

/// One task per line in `<dir>/tasks.jsonl`
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub const FILE_NAME: &'static str = "tasks.jsonl";

    /// Open or create a store in `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;
        Ok(Self {
            path: dir.join(Self::FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonlStore {
    fn load(&self) -> Result<Vec<Task>> {
        jsonl::read_jsonl(&self.path)
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        jsonl::write_jsonl_snapshot(&self.path, tasks)
    }
}

// ============================================================================
// SQLite key/value
// ============================================================================

/// Key/value table in `<dir>/duelist.db`, the whole list stored as one JSON array
pub struct SqliteStore {
    db: Connection,
}

impl SqliteStore {
    pub const DB_NAME: &'static str = "duelist.db";
    pub const TASKS_KEY: &'static str = "tasks";

    /// Open or create a store in `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let path = dir.join(Self::DB_NAME);
        let db = Connection::open(&path).context("Failed to open SQLite database")?;
        let store = Self { db };
        // Connection::open is lazy; a file that is not a database fails here
        store
            .create_schema()
            .wrap_err_with(|| format!("Failed to initialize {:?}; is it a SQLite database?", path))?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Raw value stored under `key`
    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;
        Ok(())
    }
}

impl TaskStore for SqliteStore {
    fn load(&self) -> Result<Vec<Task>> {
        let Some(raw) = self.get_item(Self::TASKS_KEY)? else {
            debug!("No stored tasks");
            return Ok(Vec::new());
        };

        let items = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = ?e, "Stored task list is malformed, starting empty");
                return Ok(Vec::new());
            }
        };

        let mut tasks = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Task>(item) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(index, error = ?e, "Skipping malformed stored task"),
            }
        }

        info!(count = tasks.len(), "Loaded tasks from SQLite");
        Ok(tasks)
    }

    fn save(&mut self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string(tasks).context("Failed to serialize tasks")?;
        self.set_item(Self::TASKS_KEY, &json)
    }
}
