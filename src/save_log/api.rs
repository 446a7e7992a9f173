// src/save_log/api.rs

use crate::types::AppState;

use super::model::{SaveEvent, SaveEventClass};

pub fn record_save_failure(state: &AppState, context: &str, key: &str, kind: &str, msg: &str) {
    tracing::warn!(context, key, kind, "draft save failed: {msg}");

    let mut slog = match state.save_log.lock() {
        Ok(g) => g,
        Err(_) => return,
    };

    slog.record_best_effort(SaveEventClass::SaveFailure, kind, context, key, msg);
}

pub fn record_load_failure(state: &AppState, context: &str, key: &str, kind: &str, msg: &str) {
    tracing::warn!(context, key, kind, "stored draft ignored: {msg}");

    let mut slog = match state.save_log.lock() {
        Ok(g) => g,
        Err(_) => return,
    };

    slog.record_best_effort(SaveEventClass::LoadFailure, kind, context, key, msg);
}

pub fn recent_save_events(state: &AppState) -> Vec<SaveEvent> {
    match state.save_log.lock() {
        Ok(slog) => slog.recent(),
        Err(_) => Vec::new(),
    }
}

/// True once after any save failure since the last call.
pub fn take_save_warn_pending(state: &AppState) -> bool {
    match state.save_log.lock() {
        Ok(mut slog) => slog.take_warn_pending(),
        Err(_) => false,
    }
}
