// src/save_log/mod.rs

mod api;
mod model;
mod store;

pub use api::{
    record_load_failure, record_save_failure, recent_save_events, take_save_warn_pending,
};

pub use model::{SaveEvent, SaveEventClass};

pub use store::SaveLog;
