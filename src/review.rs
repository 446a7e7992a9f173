// src/review.rs

//! Collaborators the wizard hands work to: the submission sink and the channel that carries
//! other roles' review comments back to the requester.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::draft::{validate_permit_id, CommentEntry, PermitDraft};
use crate::persistence::{DraftStorage, StorageError};
use crate::types::Role;

pub const REGISTER_PREFIX: &str = "permitRegister";
pub const FEEDBACK_PREFIX: &str = "permitFeedback";

/// Comments one role left on a permit. Read-only inside the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFeedback {
    pub from_role: Role,
    pub entries: Vec<CommentEntry>,
    pub posted_at: DateTime<Utc>,
}

impl ReviewFeedback {
    pub fn new(from_role: Role, entries: Vec<CommentEntry>, posted_at: DateTime<Utc>) -> Self {
        Self {
            from_role,
            entries,
            posted_at,
        }
    }
}

#[derive(Debug)]
pub enum ReviewError {
    InvalidPermitId(String),
    NotSubmittable(String),
    Storage(StorageError),
    Serialize(serde_json::Error),
}

impl std::fmt::Display for ReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewError::InvalidPermitId(msg) => write!(f, "{msg}"),
            ReviewError::NotSubmittable(msg) => write!(f, "permit not accepted: {msg}"),
            ReviewError::Storage(e) => write!(f, "{e}"),
            ReviewError::Serialize(e) => write!(f, "serialize failed: {e}"),
        }
    }
}

impl std::error::Error for ReviewError {}

impl From<StorageError> for ReviewError {
    fn from(e: StorageError) -> Self {
        ReviewError::Storage(e)
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(e: serde_json::Error) -> Self {
        ReviewError::Serialize(e)
    }
}

/// Receives a fully validated permit exactly once per successful submit.
pub trait SubmissionHandler {
    fn accept(&self, draft: PermitDraft) -> Result<(), ReviewError>;
}

pub trait ReviewChannel {
    /// Feedback posted for `permit_id`, oldest first. Unreadable entries yield nothing.
    fn feedback_for(&self, permit_id: &str) -> Vec<ReviewFeedback>;

    fn post(&self, permit_id: &str, feedback: ReviewFeedback) -> Result<(), ReviewError>;
}

/// Storage-backed stand-in for the permit register and the review inbox.
#[derive(Clone)]
pub struct LocalRegister {
    storage: Arc<dyn DraftStorage>,
}

impl LocalRegister {
    pub fn new(storage: Arc<dyn DraftStorage>) -> Self {
        Self { storage }
    }

    pub fn submitted(&self, permit_id: &str) -> Option<PermitDraft> {
        validate_permit_id(permit_id).ok()?;
        let text = self.storage.get_item(&register_key(permit_id)).ok()??;
        match serde_json::from_str(&text) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(permit_id, error = %e, "register entry unreadable");
                None
            }
        }
    }

    pub fn submitted_ids(&self) -> Vec<String> {
        let prefix = format!("{REGISTER_PREFIX}-");
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "listing submitted permits failed");
                return Vec::new();
            }
        };
        keys.into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

impl SubmissionHandler for LocalRegister {
    fn accept(&self, draft: PermitDraft) -> Result<(), ReviewError> {
        validate_permit_id(&draft.permit_id).map_err(ReviewError::InvalidPermitId)?;
        if !draft.is_submitted() {
            return Err(ReviewError::NotSubmittable(
                "status is not submitted".to_string(),
            ));
        }

        let json = serde_json::to_string(&draft)?;
        self.storage
            .set_item(&register_key(&draft.permit_id), &json)?;

        tracing::info!(
            permit_id = %draft.permit_id,
            permit_type = %draft.permit_type,
            "permit submitted"
        );
        Ok(())
    }
}

impl ReviewChannel for LocalRegister {
    fn feedback_for(&self, permit_id: &str) -> Vec<ReviewFeedback> {
        if validate_permit_id(permit_id).is_err() {
            return Vec::new();
        }
        let text = match self.storage.get_item(&feedback_key(permit_id)) {
            Ok(Some(t)) => t,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(permit_id, error = %e, "feedback read failed");
                return Vec::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(permit_id, error = %e, "feedback entry unreadable");
                Vec::new()
            }
        }
    }

    fn post(&self, permit_id: &str, feedback: ReviewFeedback) -> Result<(), ReviewError> {
        validate_permit_id(permit_id).map_err(ReviewError::InvalidPermitId)?;

        let mut all = self.feedback_for(permit_id);
        all.push(feedback);

        let json = serde_json::to_string(&all)?;
        self.storage.set_item(&feedback_key(permit_id), &json)?;
        Ok(())
    }
}

fn register_key(permit_id: &str) -> String {
    format!("{REGISTER_PREFIX}-{permit_id}")
}

fn feedback_key(permit_id: &str) -> String {
    format!("{FEEDBACK_PREFIX}-{permit_id}")
}

// ======================================================
// Unit Tests
// ======================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::PermitStatus;
    use crate::persistence::MemoryStorage;
    use crate::template::{builtin_registry, PermitKind};

    fn register() -> LocalRegister {
        LocalRegister::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn accept_requires_submitted_status() {
        let reg = register();
        let mut d = PermitDraft::new(&builtin_registry(PermitKind::Gas).unwrap(), "GAS-1");
        assert!(matches!(
            reg.accept(d.clone()),
            Err(ReviewError::NotSubmittable(_))
        ));

        d.status = PermitStatus::Submitted;
        reg.accept(d.clone()).unwrap();
        assert_eq!(reg.submitted("GAS-1"), Some(d));
        assert_eq!(reg.submitted_ids(), vec!["GAS-1".to_string()]);
    }

    #[test]
    fn feedback_accumulates_per_permit() {
        let reg = register();
        let at = Utc::now();
        reg.post(
            "HT-1",
            ReviewFeedback::new(Role::Approver, vec![CommentEntry::new("check LOTO")], at),
        )
        .unwrap();
        reg.post(
            "HT-1",
            ReviewFeedback::new(Role::SafetyOfficer, vec![CommentEntry::new("ok")], at),
        )
        .unwrap();

        let fb = reg.feedback_for("HT-1");
        assert_eq!(fb.len(), 2);
        assert_eq!(fb[0].from_role, Role::Approver);
        assert!(reg.feedback_for("HT-2").is_empty());
    }

    #[test]
    fn legacy_string_comments_in_feedback_are_normalized() {
        let mem = Arc::new(MemoryStorage::new());
        mem.insert_raw(
            "permitFeedback-HT-1",
            r#"[{"fromRole":"approver","entries":["looks fine"],"postedAt":"2026-01-02T03:04:05Z"}]"#,
        );
        let reg = LocalRegister::new(mem);
        let fb = reg.feedback_for("HT-1");
        assert_eq!(fb[0].entries, vec![CommentEntry::new("looks fine")]);
    }

    #[test]
    fn unlistable_register_reports_no_submissions() {
        let td = tempfile::tempdir().unwrap();
        let not_a_dir = td.path().join("register");
        std::fs::write(&not_a_dir, "").unwrap();

        let reg = LocalRegister::new(Arc::new(crate::persistence::FsStorage::new(&not_a_dir)));
        assert!(reg.storage.keys().is_err());
        assert!(reg.submitted_ids().is_empty());
    }
}
