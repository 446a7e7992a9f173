// src/lib.rs

pub mod command;
pub mod context;
pub mod draft;
pub mod error;
pub mod persistence;
pub mod preview;
pub mod review;
pub mod save_log;
pub mod template;
pub mod types;

use crate::save_log::SaveLog;
use crate::types::{AppState, Role};
use std::path::Path;

pub fn init_state(app_data_dir: &Path, role: Role) -> Result<AppState, String> {
    std::fs::create_dir_all(app_data_dir)
        .map_err(|e| format!("Failed to create app data dir: {e}"))?;

    let save_log = SaveLog::init(app_data_dir)?;

    Ok(AppState::with_save_log(role, save_log))
}

impl AppState {
    pub fn new_for_tests(app_data_dir: &std::path::Path) -> Result<Self, String> {
        crate::init_state(app_data_dir, Role::Requester)
    }
}
