// src/command/permit_wizard/types.rs

use std::sync::Arc;

use crate::command::permit_wizard::validate::FieldError;
use crate::draft::{FormStateStore, PathError};
use crate::persistence::{Autosaver, DraftPersistence};
use crate::review::{ReviewError, ReviewFeedback};
use crate::template::{StepRegistry, TemplateLoadError};
use crate::types::Role;

/// One open permit form.
///
/// The store owns the draft; everything else here is navigation and derived state.
pub struct WizardState {
    pub registry: Arc<StepRegistry>,
    pub store: FormStateStore,
    pub role: Role,

    /// Active step index.
    pub current: usize,

    /// Set for restricted roles; navigation is a no-op while pinned.
    pub pinned: Option<usize>,

    pub progress: Progress,

    /// Field errors from the last blocked `next` or rejected submit.
    pub last_errors: Vec<FieldError>,

    /// Other roles' comments, shown read-only.
    pub feedback: Vec<ReviewFeedback>,

    pub autosaver: Autosaver,
    pub persistence: Arc<DraftPersistence>,

    /// True when the draft came from storage rather than being seeded.
    pub restored: bool,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Completion per step, registry order.
    pub per_step: Vec<bool>,
}

impl Progress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Now on this index (may equal the old one, e.g. `back` at 0).
    Moved(usize),
    /// Current step failed validation; index unchanged.
    Blocked(Vec<FieldError>),
    Submitted,
    /// Full-document validation failed; status stays draft.
    Rejected(Vec<FieldError>),
    /// Restricted role; nothing changed.
    Pinned,
}

#[derive(Debug)]
pub enum WizardError {
    InvalidPermitId(String),
    UnknownStep(String),
    StepOutOfRange { index: usize, count: usize },
    StepNotEditable { step_id: String },
    Path(PathError),
    InputProblem(String),
    TemplateParse(TemplateLoadError),
    AlreadySubmitted,
    Closed,
    Submission(ReviewError),
    InvalidState(String),
}

impl std::fmt::Display for WizardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WizardError::InvalidPermitId(msg) => write!(f, "{msg}"),
            WizardError::UnknownStep(id) => write!(f, "unknown step '{id}'"),
            WizardError::StepOutOfRange { index, count } => {
                write!(f, "invalid step index {index}; step_count={count}")
            }
            WizardError::StepNotEditable { step_id } => {
                write!(f, "step '{step_id}' is not editable for this role")
            }
            WizardError::Path(e) => write!(f, "{e}"),
            WizardError::InputProblem(msg) => write!(f, "{msg}"),
            WizardError::TemplateParse(e) => write!(f, "{e}"),
            WizardError::AlreadySubmitted => write!(f, "permit already submitted"),
            WizardError::Closed => write!(f, "wizard is closed"),
            WizardError::Submission(e) => write!(f, "submission failed: {e}"),
            WizardError::InvalidState(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for WizardError {}

impl From<PathError> for WizardError {
    fn from(e: PathError) -> Self {
        WizardError::Path(e)
    }
}

impl From<TemplateLoadError> for WizardError {
    fn from(e: TemplateLoadError) -> Self {
        WizardError::TemplateParse(e)
    }
}

impl From<ReviewError> for WizardError {
    fn from(e: ReviewError) -> Self {
        WizardError::Submission(e)
    }
}
