// src/persistence/mod.rs

pub mod adapter;
pub mod autosave;
pub mod storage;

pub use adapter::{DraftPersistence, SaveOutcome};
pub use autosave::{AutosavePolicy, Autosaver, DEFAULT_DEBOUNCE, DEFAULT_MAX_LATENCY};
pub use storage::{DraftStorage, FsStorage, MemoryStorage, StorageError, ITEM_MAX_BYTES};
