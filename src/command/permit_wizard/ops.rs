// src/command/permit_wizard/ops.rs

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::command::permit_wizard::flow::refresh_progress;
use crate::command::permit_wizard::types::{Progress, WizardError, WizardState};
use crate::draft::{validate_permit_id, Answer, FieldInput, FieldPath, FormStateStore, PermitDraft};
use crate::persistence::{AutosavePolicy, Autosaver, DraftPersistence, SaveOutcome};
use crate::review::ReviewFeedback;
use crate::template::{FieldType, StepRegistry};
use crate::types::Role;

/// Load the stored draft for `permit_id` (or seed a fresh one) and position the controller.
///
/// Roles the registry pins to a step start there and stay there.
pub fn open_wizard(
    persistence: Arc<DraftPersistence>,
    permit_id: &str,
    role: Role,
    feedback: Vec<ReviewFeedback>,
    policy: AutosavePolicy,
) -> Result<WizardState, WizardError> {
    validate_permit_id(permit_id).map_err(WizardError::InvalidPermitId)?;

    let registry = persistence.registry().clone();
    if registry.is_empty() {
        return Err(WizardError::InvalidState(
            "registry has no steps".to_string(),
        ));
    }

    let (draft, restored) = match persistence.load(permit_id) {
        Some(d) => (d, true),
        None => {
            let mut fresh = PermitDraft::new(&registry, permit_id);
            if let Some(stored) = persistence.stored_revision(permit_id) {
                fresh.revision = stored + 1;
            }
            (fresh, false)
        }
    };
    let store = FormStateStore::new(registry.clone(), draft);

    let pinned = registry
        .restricted_step_for(role)
        .and_then(|id| registry.index_of(id));

    let mut state = WizardState {
        autosaver: Autosaver::new(policy, store.revision()),
        registry,
        store,
        role,
        current: pinned.unwrap_or(0),
        pinned,
        progress: Progress::default(),
        last_errors: Vec::new(),
        feedback,
        persistence,
        restored,
        closed: false,
    };
    refresh_progress(&mut state);

    tracing::info!(
        permit_id,
        permit_type = %state.registry.template_id(),
        role = %role,
        restored,
        pinned = ?state.pinned,
        "wizard opened"
    );
    Ok(state)
}

pub fn set_field(
    state: &mut WizardState,
    path: &str,
    input: FieldInput,
    now: Instant,
) -> Result<(), WizardError> {
    let parsed: FieldPath = path.parse()?;
    set_field_at(state, &parsed, input, now)
}

pub fn set_field_at(
    state: &mut WizardState,
    path: &FieldPath,
    input: FieldInput,
    now: Instant,
) -> Result<(), WizardError> {
    ensure_editable(state, path.step())?;
    state.store.set(path, input)?;
    after_mutation(state, path.step(), path.field_key(), now);
    Ok(())
}

/// Like [`set_field`], parsing `raw` according to the target field's type.
pub fn set_field_from_str(
    state: &mut WizardState,
    path: &str,
    raw: &str,
    now: Instant,
) -> Result<(), WizardError> {
    let parsed: FieldPath = path.parse()?;
    let input = input_from_str(&state.registry, &parsed, raw)?;
    set_field_at(state, &parsed, input, now)
}

pub fn append_comment(
    state: &mut WizardState,
    step_id: &str,
    field: &str,
    text: &str,
    now: Instant,
) -> Result<usize, WizardError> {
    if text.trim().is_empty() {
        return Err(WizardError::InputProblem("comment is empty".to_string()));
    }
    ensure_editable(state, step_id)?;
    let idx = state.store.append_comment(step_id, field, text)?;
    after_mutation(state, step_id, field, now);
    Ok(idx)
}

pub fn attach_feedback(state: &mut WizardState, feedback: Vec<ReviewFeedback>) {
    state.feedback.extend(feedback);
    state.feedback.sort_by_key(|f| f.posted_at);
}

/// Saves if the autosaver says a save is due. Call from the surface's event loop.
pub fn autosave_tick(state: &mut WizardState, now: Instant) -> Option<SaveOutcome> {
    if state.closed || !state.autosaver.is_due(now) {
        return None;
    }
    Some(save_now(state, "autosave", now))
}

/// Explicit "save draft": stamps `updatedAt` and writes immediately.
pub fn save_draft(state: &mut WizardState, now: Instant) -> Result<SaveOutcome, WizardError> {
    if state.closed {
        return Err(WizardError::Closed);
    }
    state.store.stamp(Utc::now());
    Ok(save_now(state, "save_draft", now))
}

/// Flushes pending changes and stops autosaving. Idempotent.
pub fn close_wizard(state: &mut WizardState, now: Instant) -> Option<SaveOutcome> {
    if state.closed {
        return None;
    }
    let flushed = if state.autosaver.is_dirty() {
        Some(save_now(state, "close", now))
    } else {
        None
    };
    state.autosaver.stop();
    state.closed = true;

    tracing::info!(permit_id = %state.store.permit_id(), ?flushed, "wizard closed");
    flushed
}

/// Writes the current snapshot. A skip because another writer stored a higher revision is
/// already in the save log; this session then takes the next revision and writes again, so
/// the last save wins.
pub(crate) fn save_now(state: &mut WizardState, context: &str, now: Instant) -> SaveOutcome {
    let mut snap = state.store.snapshot();
    let mut outcome = state.persistence.save(&snap, context);

    if outcome == SaveOutcome::SkippedStale {
        if let Some(stored) = state.persistence.stored_revision(state.store.permit_id()) {
            state.store.advance_revision_past(stored);
            snap = state.store.snapshot();
            outcome = state.persistence.save(&snap, context);
        }
    }

    match outcome {
        SaveOutcome::Written => state.autosaver.mark_saved(snap.revision),
        SaveOutcome::SkippedStale | SaveOutcome::Failed => state.autosaver.retry_later(now),
    }
    outcome
}

fn ensure_editable(state: &WizardState, step_id: &str) -> Result<(), WizardError> {
    if state.closed {
        return Err(WizardError::Closed);
    }
    if state.store.draft().is_submitted() {
        return Err(WizardError::AlreadySubmitted);
    }
    if let Some(p) = state.pinned {
        if state.registry.id_at(p) != Some(step_id) {
            return Err(WizardError::StepNotEditable {
                step_id: step_id.to_string(),
            });
        }
    }
    Ok(())
}

fn after_mutation(state: &mut WizardState, step_id: &str, field: &str, now: Instant) {
    state
        .last_errors
        .retain(|e| !(e.step_id == step_id && e.field == field));
    refresh_progress(state);
    state.autosaver.note_change(state.store.revision(), now);
}

/// Unknown steps/fields fall through as text so the store reports the path error.
fn input_from_str(
    registry: &StepRegistry,
    path: &FieldPath,
    raw: &str,
) -> Result<FieldInput, WizardError> {
    let Some(spec) = registry
        .step_by_id(path.step())
        .and_then(|s| s.field(path.field_key()))
    else {
        return Ok(FieldInput::Text(raw.to_string()));
    };

    let input = match path {
        FieldPath::Field { .. } if spec.field_type.is_flag() => FieldInput::Flag(parse_flag(raw)?),
        FieldPath::Field { .. } => FieldInput::Text(raw.to_string()),
        FieldPath::Item { column, .. } => match (spec.field_type, column.as_str()) {
            (FieldType::Checklist, "answer") => {
                FieldInput::Answer(Answer::parse(raw).ok_or_else(|| {
                    WizardError::InputProblem(format!("'{raw}' is not yes / na / empty"))
                })?)
            }
            (FieldType::Comments, "checked") => FieldInput::Flag(parse_flag(raw)?),
            _ => FieldInput::Text(raw.to_string()),
        },
    };
    Ok(input)
}

pub fn parse_flag(raw: &str) -> Result<bool, WizardError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "on" | "x" => Ok(true),
        "false" | "no" | "n" | "0" | "off" | "" => Ok(false),
        other => Err(WizardError::InputProblem(format!(
            "'{other}' is not a yes/no value"
        ))),
    }
}

// ======================================================
// Unit Tests
// ======================================================
