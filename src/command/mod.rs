// src/command/mod.rs

pub mod permit_wizard;

pub use permit_wizard::{
    close_wizard, open_wizard, save_draft, set_field_from_str, step_back, step_next, submit,
    NavOutcome, WizardError, WizardState,
};
