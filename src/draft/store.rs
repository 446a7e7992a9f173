// src/draft/store.rs

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::draft::model::{Answer, CommentEntry, FieldValue, PermitDraft, PermitStatus, StepRecord};
use crate::draft::path::{FieldPath, PathError};
use crate::template::{FieldSpec, FieldType, StepRegistry, StepTemplate};

/// A value written through [`FormStateStore::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    Text(String),
    Flag(bool),
    Answer(Answer),
    /// Whole-field replacement; must fit the field type.
    Value(FieldValue),
}

impl FieldInput {
    fn kind_name(&self) -> &'static str {
        match self {
            FieldInput::Text(_) => "text",
            FieldInput::Flag(_) => "bool",
            FieldInput::Answer(_) => "answer",
            FieldInput::Value(v) => v.kind_name(),
        }
    }
}

pub const CHECKLIST_COLUMNS: &[&str] = &["answer", "remarks"];
pub const SIGNATORY_COLUMNS: &[&str] = &["name", "signatureImage", "contactNo", "date", "time"];
pub const COMMENT_COLUMNS: &[&str] = &["text", "checked"];

/// Authoritative in-memory copy of a draft for one wizard session.
///
/// Every successful `set` replaces the touched step's `Arc` with a fresh one, so callers
/// holding an older snapshot can detect the change with `Arc::ptr_eq`.
#[derive(Debug, Clone)]
pub struct FormStateStore {
    registry: Arc<StepRegistry>,
    draft: PermitDraft,
}

impl FormStateStore {
    pub fn new(registry: Arc<StepRegistry>, mut draft: PermitDraft) -> Self {
        draft.normalize(&registry);
        Self { registry, draft }
    }

    pub fn fresh(registry: Arc<StepRegistry>, permit_id: &str) -> Self {
        let draft = PermitDraft::new(&registry, permit_id);
        Self { registry, draft }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn draft(&self) -> &PermitDraft {
        &self.draft
    }

    pub fn permit_id(&self) -> &str {
        &self.draft.permit_id
    }

    pub fn revision(&self) -> u64 {
        self.draft.revision
    }

    /// Full snapshot; step records are shared, not deep-copied.
    pub fn snapshot(&self) -> PermitDraft {
        self.draft.clone()
    }

    /// Current values for a step, or its seeded default shape. Never fails.
    pub fn get(&self, step_id: &str) -> Arc<StepRecord> {
        if let Some(rec) = self.draft.step_data.get(step_id) {
            return rec.clone();
        }
        match self.registry.step_by_id(step_id) {
            Some(step) => Arc::new(StepRecord::seeded(step)),
            None => Arc::new(StepRecord::default()),
        }
    }

    pub fn set_path(&mut self, path: &str, input: FieldInput) -> Result<(), PathError> {
        let parsed: FieldPath = path.parse()?;
        self.set(&parsed, input)
    }

    pub fn set(&mut self, path: &FieldPath, input: FieldInput) -> Result<(), PathError> {
        let (step, spec) = self.resolve(path)?;

        let current = self.get(&step.id);
        let mut next = (*current).clone();
        apply(&mut next, path, spec, input)?;

        let step_id = step.id.clone();
        self.draft.step_data.insert(step_id, Arc::new(next));
        self.draft.revision += 1;
        Ok(())
    }

    /// Appends an unchecked comment; returns its index.
    pub fn append_comment(
        &mut self,
        step_id: &str,
        field: &str,
        text: &str,
    ) -> Result<usize, PathError> {
        let path = FieldPath::field(step_id, field);
        let (step, spec) = self.resolve(&path)?;
        if spec.field_type != FieldType::Comments {
            return Err(PathError::new(path.to_string(), "field does not hold comments"));
        }

        let mut next = (*self.get(&step.id)).clone();
        let entries = match next.fields.entry(spec.key.clone()).or_insert_with(|| {
            FieldValue::Comments(Vec::new())
        }) {
            FieldValue::Comments(entries) => entries,
            other => {
                return Err(PathError::new(
                    path.to_string(),
                    format!("stored value is {}, expected comments", other.kind_name()),
                ))
            }
        };
        entries.push(CommentEntry::new(text));
        let idx = entries.len() - 1;

        let step_id = step.id.clone();
        self.draft.step_data.insert(step_id, Arc::new(next));
        self.draft.revision += 1;
        Ok(idx)
    }

    /// Sets `updatedAt` without counting as a user edit.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        self.draft.updated_at = Some(now);
    }

    /// Moves the revision past `floor` so the next save outranks a record written elsewhere.
    pub fn advance_revision_past(&mut self, floor: u64) {
        if self.draft.revision <= floor {
            self.draft.revision = floor + 1;
        }
    }

    pub fn mark_submitted(&mut self, now: DateTime<Utc>) {
        self.draft.status = PermitStatus::Submitted;
        self.draft.updated_at = Some(now);
        self.draft.revision += 1;
    }

    fn resolve(&self, path: &FieldPath) -> Result<(&StepTemplate, &FieldSpec), PathError> {
        let step = self
            .registry
            .step_by_id(path.step())
            .ok_or_else(|| PathError::new(path.to_string(), "unknown step"))?;
        let spec = step
            .field(path.field_key())
            .ok_or_else(|| PathError::new(path.to_string(), "unknown field"))?;
        Ok((step, spec))
    }
}

fn apply(
    rec: &mut StepRecord,
    path: &FieldPath,
    spec: &FieldSpec,
    input: FieldInput,
) -> Result<(), PathError> {
    let mismatch = |input: &FieldInput| {
        PathError::new(
            path.to_string(),
            format!(
                "field '{}' ({:?}) cannot take a {} value",
                spec.key,
                spec.field_type,
                input.kind_name()
            ),
        )
    };

    match path {
        FieldPath::Field { .. } => {
            let value = match input {
                FieldInput::Text(s) if spec.field_type.is_scalar_text() => FieldValue::Text(s),
                FieldInput::Flag(b) if spec.field_type.is_flag() => FieldValue::Bool(b),
                FieldInput::Value(v) if v.fits(spec.field_type) => v,
                other => return Err(mismatch(&other)),
            };
            rec.fields.insert(spec.key.clone(), value);
            Ok(())
        }
        FieldPath::Item { index, column, .. } => {
            if !rec.fields.contains_key(&spec.key) {
                let seeded = FieldValue::seed(spec)
                    .ok_or_else(|| PathError::new(path.to_string(), "field has no items"))?;
                rec.fields.insert(spec.key.clone(), seeded);
            }
            let slot = rec
                .fields
                .get_mut(&spec.key)
                .ok_or_else(|| PathError::new(path.to_string(), "field has no items"))?;
            let out_of_range = |len: usize| {
                PathError::new(
                    path.to_string(),
                    format!("index {index} out of range (len {len})"),
                )
            };

            match slot {
                FieldValue::Checklist(rows) => {
                    let len = rows.len();
                    let row = rows.get_mut(*index).ok_or_else(|| out_of_range(len))?;
                    match (column.as_str(), input) {
                        ("answer", FieldInput::Answer(a)) => row.answer = a,
                        ("answer", FieldInput::Text(s)) => {
                            row.answer = Answer::parse(&s).ok_or_else(|| {
                                PathError::new(path.to_string(), format!("bad answer '{s}'"))
                            })?;
                        }
                        ("remarks", FieldInput::Text(s)) => row.remarks = s,
                        (c, other) if CHECKLIST_COLUMNS.contains(&c) => {
                            return Err(mismatch(&other))
                        }
                        (c, _) => return Err(unknown_column(path, c, CHECKLIST_COLUMNS)),
                    }
                }
                FieldValue::Signatories(blocks) => {
                    let len = blocks.len();
                    let block = blocks.get_mut(*index).ok_or_else(|| out_of_range(len))?;
                    let target = match column.as_str() {
                        "name" => &mut block.name,
                        "signatureImage" => &mut block.signature_image,
                        "contactNo" => &mut block.contact_no,
                        "date" => &mut block.date,
                        "time" => &mut block.time,
                        c => return Err(unknown_column(path, c, SIGNATORY_COLUMNS)),
                    };
                    match input {
                        FieldInput::Text(s) => *target = s,
                        other => return Err(mismatch(&other)),
                    }
                }
                FieldValue::Comments(entries) => {
                    let len = entries.len();
                    let entry = entries.get_mut(*index).ok_or_else(|| out_of_range(len))?;
                    match (column.as_str(), input) {
                        ("text", FieldInput::Text(s)) => entry.text = s,
                        ("checked", FieldInput::Flag(b)) => entry.checked = b,
                        (c, other) if COMMENT_COLUMNS.contains(&c) => return Err(mismatch(&other)),
                        (c, _) => return Err(unknown_column(path, c, COMMENT_COLUMNS)),
                    }
                }
                other => {
                    return Err(PathError::new(
                        path.to_string(),
                        format!("{} value has no items", other.kind_name()),
                    ))
                }
            }
            Ok(())
        }
    }
}

fn unknown_column(path: &FieldPath, column: &str, allowed: &[&str]) -> PathError {
    PathError::new(
        path.to_string(),
        format!("unknown column '{column}' (expected one of: {})", allowed.join(", ")),
    )
}
