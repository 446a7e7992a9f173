// src/command/permit_wizard/nav.rs

use crate::command::permit_wizard::types::{NavOutcome, WizardError, WizardState};
use crate::template::{StepDef, StepTemplate};

pub fn current_step(state: &WizardState) -> Result<&StepTemplate, WizardError> {
    state
        .registry
        .step(state.current)
        .ok_or_else(|| WizardError::InvalidState("current step index out of range".to_string()))
}

pub fn step_count(state: &WizardState) -> usize {
    state.registry.len()
}

pub fn is_pinned(state: &WizardState) -> bool {
    state.pinned.is_some()
}

/// Steps the step indicator should show. A pinned controller shows only its step.
pub fn visible_steps(state: &WizardState) -> Vec<StepDef> {
    match state.pinned.and_then(|i| state.registry.step(i)) {
        Some(step) => vec![step.def()],
        None => state.registry.step_defs(),
    }
}

/// Unconditional; clamps at 0.
pub fn step_back(state: &mut WizardState) -> Result<NavOutcome, WizardError> {
    if state.closed {
        return Err(WizardError::Closed);
    }
    if state.pinned.is_some() {
        return Ok(NavOutcome::Pinned);
    }

    state.current = state.current.saturating_sub(1);
    state.last_errors.clear();
    Ok(NavOutcome::Moved(state.current))
}

/// Free jump to any step, regardless of completion.
pub fn jump_to(state: &mut WizardState, index: usize) -> Result<NavOutcome, WizardError> {
    if state.closed {
        return Err(WizardError::Closed);
    }
    if state.pinned.is_some() {
        return Ok(NavOutcome::Pinned);
    }

    let count = step_count(state);
    if index >= count {
        return Err(WizardError::StepOutOfRange { index, count });
    }

    state.current = index;
    state.last_errors.clear();
    Ok(NavOutcome::Moved(index))
}

pub fn jump_to_id(state: &mut WizardState, step_id: &str) -> Result<NavOutcome, WizardError> {
    if state.pinned.is_some() && !state.closed {
        return Ok(NavOutcome::Pinned);
    }
    let index = state
        .registry
        .index_of(step_id)
        .ok_or_else(|| WizardError::UnknownStep(step_id.to_string()))?;
    jump_to(state, index)
}

/// Pin the controller to `step_id`; later next/back/jump calls do nothing.
pub fn force_restrict(state: &mut WizardState, step_id: &str) -> Result<(), WizardError> {
    let index = state
        .registry
        .index_of(step_id)
        .ok_or_else(|| WizardError::UnknownStep(step_id.to_string()))?;

    state.pinned = Some(index);
    state.current = index;
    state.last_errors.clear();

    tracing::debug!(step_id, index, "wizard pinned");
    Ok(())
}

// ======================================================
// Unit Tests
// ======================================================
