// src/save_log/model.rs

use serde::{Deserialize, Serialize};

pub const LOG_FILE_NAME: &str = "save.log.jsonl";
pub const LOG_BACKUP_NAME: &str = "save.log.jsonl.1";

pub const MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;
pub const MAX_LOG_EVENTS: usize = 50;
pub const LOAD_TAIL_LINES: usize = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveEventClass {
    /// A draft write was dropped; the user may lose changes on reload.
    SaveFailure,
    /// A stored draft could not be read back and was treated as absent.
    LoadFailure,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveEvent {
    pub id: u64,
    pub ts_ms: u64,
    pub class: SaveEventClass,
    pub kind: String,
    pub context: String,
    pub key: String,
    pub msg: String,
}
