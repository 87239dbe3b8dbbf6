// Duelist - assignment tracker with due-date filtering and sorting

pub mod config;
pub mod error;
pub mod filter;
pub mod jsonl;
pub mod models;
pub mod render;
pub mod store;
pub mod tracker;
pub mod view;

// Re-export main types for convenience
pub use config::Config;
pub use error::TrackerError;
pub use filter::{FilterMode, SortMode, ViewState};
pub use models::{Status, Task, TaskFields, TaskId, now_ms};
pub use store::{Backend, JsonlStore, MemoryStore, SqliteStore, TaskStore, open_store};
pub use tracker::Tracker;
pub use view::{DisplayRow, compute_display_list, derive_status};
