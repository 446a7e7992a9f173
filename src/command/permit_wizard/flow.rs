// src/command/permit_wizard/flow.rs

//! Forward transitions: gated `next`, the final submit, and the progress they feed.

use std::time::Instant;

use chrono::Utc;

use crate::command::permit_wizard::ops::save_now;
use crate::command::permit_wizard::types::{NavOutcome, Progress, WizardError, WizardState};
use crate::command::permit_wizard::validate::{
    step_is_complete, validate_document, validate_step, FieldError,
};
use crate::draft::{PermitDraft, PermitStatus, StepRecord};
use crate::review::SubmissionHandler;
use crate::template::StepRegistry;

/// Completed-step count over every step, independent of the active index.
pub fn compute_progress(registry: &StepRegistry, draft: &PermitDraft) -> Progress {
    let empty = StepRecord::default();
    let per_step: Vec<bool> = registry
        .steps()
        .iter()
        .map(|step| {
            let rec = draft
                .step_data
                .get(&step.id)
                .map(|r| r.as_ref())
                .unwrap_or(&empty);
            step_is_complete(step, rec)
        })
        .collect();

    Progress {
        completed: per_step.iter().filter(|ok| **ok).count(),
        total: per_step.len(),
        per_step,
    }
}

pub fn refresh_progress(state: &mut WizardState) {
    state.progress = compute_progress(&state.registry, state.store.draft());
}

/// Every field error across the document, registry order.
pub fn validate_all(state: &WizardState) -> Vec<FieldError> {
    validate_document(&state.registry, state.store.draft())
        .into_iter()
        .flat_map(|r| r.errors)
        .collect()
}

/// Advance if the current step validates; on the last step this submits instead.
pub fn step_next(
    state: &mut WizardState,
    handler: &dyn SubmissionHandler,
    now: Instant,
) -> Result<NavOutcome, WizardError> {
    if state.closed {
        return Err(WizardError::Closed);
    }
    if state.pinned.is_some() {
        return Ok(NavOutcome::Pinned);
    }

    let i = state.current;
    let step = state
        .registry
        .step(i)
        .ok_or_else(|| WizardError::InvalidState("current step index out of range".to_string()))?;

    let report = validate_step(step, &state.store.get(&step.id));
    if !report.is_complete() {
        tracing::debug!(step_id = %step.id, errors = report.errors.len(), "next blocked");
        state.last_errors = report.errors.clone();
        return Ok(NavOutcome::Blocked(report.errors));
    }

    if i >= state.registry.last_index() {
        return submit(state, handler, now);
    }

    state.current = i + 1;
    state.last_errors.clear();
    Ok(NavOutcome::Moved(state.current))
}

/// Full-document validation, then a single hand-off to `handler`.
///
/// On rejection the status stays draft and the active step is unchanged. The handler is
/// not called when validation fails, and a submitted permit cannot be submitted again.
pub fn submit(
    state: &mut WizardState,
    handler: &dyn SubmissionHandler,
    now: Instant,
) -> Result<NavOutcome, WizardError> {
    if state.closed {
        return Err(WizardError::Closed);
    }
    if state.store.draft().is_submitted() {
        return Err(WizardError::AlreadySubmitted);
    }

    let errors = validate_all(state);
    if !errors.is_empty() {
        tracing::info!(
            permit_id = %state.store.permit_id(),
            errors = errors.len(),
            "submit rejected"
        );
        state.last_errors = errors.clone();
        return Ok(NavOutcome::Rejected(errors));
    }

    let at = Utc::now();
    let mut final_doc = state.store.snapshot();
    final_doc.status = PermitStatus::Submitted;
    final_doc.updated_at = Some(at);
    final_doc.revision += 1;

    handler.accept(final_doc)?;

    state.store.mark_submitted(at);
    state.last_errors.clear();
    refresh_progress(state);

    state.autosaver.note_change(state.store.revision(), now);
    save_now(state, "submit", now);

    tracing::info!(permit_id = %state.store.permit_id(), "permit submitted");
    Ok(NavOutcome::Submitted)
}

// ======================================================
// Unit Tests
// ======================================================
