// src/draft/mod.rs

pub mod model;
pub mod path;
pub mod store;

pub use model::{
    generate_permit_id, validate_permit_id, Answer, ChecklistRow, CommentEntry, FieldValue,
    PermitDraft, PermitStatus, SignatoryBlock, StepRecord, PERMIT_ID_MAX_LEN,
};
pub use path::{FieldPath, PathError, STEP_DATA_PREFIX};
pub use store::{FieldInput, FormStateStore};
