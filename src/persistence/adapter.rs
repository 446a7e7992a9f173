// src/persistence/adapter.rs

use serde::Deserialize;
use std::sync::{Arc, Mutex};

use crate::draft::{validate_permit_id, PermitDraft};
use crate::persistence::storage::DraftStorage;
use crate::save_log::{record_load_failure, record_save_failure};
use crate::template::StepRegistry;
use crate::types::{AppState, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Storage already holds a newer revision; nothing written. Recorded in the save log.
    SkippedStale,
    /// Swallowed; recorded in the save log.
    Failed,
}

/// Best-effort draft cache for one permit type. Never returns an error to the caller.
pub struct DraftPersistence {
    storage: Arc<dyn DraftStorage>,
    registry: Arc<StepRegistry>,
    state: Arc<AppState>,
    // check-then-write must not interleave
    write_lock: Mutex<()>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredHeader {
    permit_id: String,
    permit_type: String,
    #[serde(default)]
    revision: u64,
}

impl DraftPersistence {
    pub fn new(
        storage: Arc<dyn DraftStorage>,
        registry: Arc<StepRegistry>,
        state: Arc<AppState>,
    ) -> Self {
        Self {
            storage,
            registry,
            state,
            write_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Role of the session this adapter saves for.
    pub fn acting_role(&self) -> Role {
        self.state.role()
    }

    pub fn storage(&self) -> &Arc<dyn DraftStorage> {
        &self.storage
    }

    /// `<storage_prefix>-<permitId>`
    pub fn key_for(&self, permit_id: &str) -> String {
        format!("{}-{}", self.registry.storage_prefix(), permit_id)
    }

    pub fn save(&self, draft: &PermitDraft, context: &str) -> SaveOutcome {
        let key = self.key_for(&draft.permit_id);

        if let Err(msg) = validate_permit_id(&draft.permit_id) {
            record_save_failure(&self.state, context, &key, "invalid_id", &msg);
            return SaveOutcome::Failed;
        }

        let _guard = match self.write_lock.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };

        if let Some(stored) = self.stored_revision(&draft.permit_id) {
            if stored > draft.revision {
                record_save_failure(
                    &self.state,
                    context,
                    &key,
                    "stale",
                    &format!(
                        "storage holds revision {stored}, save had {}; nothing written",
                        draft.revision
                    ),
                );
                return SaveOutcome::SkippedStale;
            }
        }

        let json = match serde_json::to_string(draft) {
            Ok(s) => s,
            Err(e) => {
                record_save_failure(&self.state, context, &key, "serialize", &e.to_string());
                return SaveOutcome::Failed;
            }
        };

        match self.storage.set_item(&key, &json) {
            Ok(()) => {
                tracing::debug!(key = %key, revision = draft.revision, context, "draft saved");
                SaveOutcome::Written
            }
            Err(e) => {
                record_save_failure(&self.state, context, &key, e.kind(), &e.to_string());
                SaveOutcome::Failed
            }
        }
    }

    /// None when absent, unreadable, corrupt, or belonging to another permit/type.
    pub fn load(&self, permit_id: &str) -> Option<PermitDraft> {
        if validate_permit_id(permit_id).is_err() {
            return None;
        }
        let key = self.key_for(permit_id);

        let text = match self.storage.get_item(&key) {
            Ok(Some(t)) => t,
            Ok(None) => return None,
            Err(e) => {
                record_load_failure(&self.state, "load", &key, e.kind(), &e.to_string());
                return None;
            }
        };

        let mut draft: PermitDraft = match serde_json::from_str(&text) {
            Ok(d) => d,
            Err(e) => {
                record_load_failure(&self.state, "load", &key, "corrupt", &e.to_string());
                return None;
            }
        };

        if draft.permit_id != permit_id || draft.permit_type != self.registry.template_id() {
            record_load_failure(
                &self.state,
                "load",
                &key,
                "mismatch",
                &format!(
                    "stored draft is {}/{}, expected {}/{}",
                    draft.permit_type,
                    draft.permit_id,
                    self.registry.template_id(),
                    permit_id
                ),
            );
            return None;
        }

        draft.normalize(&self.registry);
        Some(draft)
    }

    /// Returns false only if the storage refused the removal.
    pub fn discard(&self, permit_id: &str) -> bool {
        if validate_permit_id(permit_id).is_err() {
            return false;
        }
        let key = self.key_for(permit_id);
        match self.storage.remove_item(&key) {
            Ok(()) => {
                tracing::info!(key = %key, "draft discarded");
                true
            }
            Err(e) => {
                record_save_failure(&self.state, "discard", &key, e.kind(), &e.to_string());
                false
            }
        }
    }

    /// Permit ids with a stored draft of this type.
    pub fn list_ids(&self) -> Vec<String> {
        let prefix = format!("{}-", self.registry.storage_prefix());
        match self.storage.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
                .filter(|id| validate_permit_id(id).is_ok())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "listing stored drafts failed");
                Vec::new()
            }
        }
    }

    /// Revision of the stored record for `permit_id`, counted only if that record would
    /// load: it parses and names this permit and type. Anything else is overwritable.
    pub fn stored_revision(&self, permit_id: &str) -> Option<u64> {
        let text = self.storage.get_item(&self.key_for(permit_id)).ok()??;
        let stored: StoredHeader = serde_json::from_str(&text).ok()?;
        if stored.permit_id != permit_id || stored.permit_type != self.registry.template_id() {
            return None;
        }
        serde_json::from_str::<PermitDraft>(&text).ok()?;
        Some(stored.revision)
    }
}

// ======================================================
// Unit Tests
// ======================================================
