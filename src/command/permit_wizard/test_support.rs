// src/command/permit_wizard/test_support.rs

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::command::permit_wizard::ops::{append_comment, open_wizard, set_field, set_field_at};
use crate::command::permit_wizard::types::WizardState;
use crate::draft::{Answer, FieldInput, FieldPath, PermitDraft};
use crate::persistence::{AutosavePolicy, DraftPersistence, MemoryStorage};
use crate::review::{ReviewError, SubmissionHandler};
use crate::template::{builtin_registry, FieldType, PermitKind};
use crate::types::{AppState, Role};

pub(crate) fn open_on(
    mem: Arc<MemoryStorage>,
    app: Arc<AppState>,
    kind: PermitKind,
    permit_id: &str,
    role: Role,
) -> WizardState {
    let registry = Arc::new(builtin_registry(kind).unwrap());
    let persistence = Arc::new(DraftPersistence::new(mem, registry, app));
    open_wizard(
        persistence,
        permit_id,
        role,
        Vec::new(),
        AutosavePolicy::default(),
    )
    .unwrap()
}

pub(crate) fn open_memory(
    kind: PermitKind,
    permit_id: &str,
    role: Role,
) -> (WizardState, Arc<MemoryStorage>) {
    let mem = Arc::new(MemoryStorage::new());
    let w = open_on(
        mem.clone(),
        Arc::new(AppState::in_memory()),
        kind,
        permit_id,
        role,
    );
    (w, mem)
}

pub(crate) fn fill_basic_ht(w: &mut WizardState, now: Instant) {
    for (k, v) in [
        ("jobDescription", "Replace VCB on feeder 4"),
        ("substation", "SS-2"),
        ("feederName", "F4"),
        ("voltageLevel", "11 kV"),
        ("startDate", "2026-03-10"),
        ("startTime", "08:30"),
        ("endDate", "2026-03-10"),
        ("endTime", "17:00"),
    ] {
        set_field(w, &format!("basic.{k}"), FieldInput::Text(v.into()), now).unwrap();
    }
}

/// Puts a valid value in every field of every step.
pub(crate) fn complete_all(w: &mut WizardState, now: Instant) {
    let registry = w.registry.clone();
    for step in registry.steps() {
        for spec in step.fields.iter() {
            let path = FieldPath::field(&step.id, &spec.key);
            match spec.field_type {
                FieldType::Text => {
                    let rules = spec.validators.clone().unwrap_or_default();
                    let v = if rules.iter().any(|r| r == "number") {
                        "1"
                    } else if rules.iter().any(|r| r.starts_with("regex:")) {
                        "11 kV"
                    } else {
                        "Sample entry"
                    };
                    set_field_at(w, &path, FieldInput::Text(v.into()), now).unwrap();
                }
                FieldType::Date => {
                    set_field_at(w, &path, FieldInput::Text("2026-03-10".into()), now).unwrap()
                }
                FieldType::Time => {
                    set_field_at(w, &path, FieldInput::Text("08:30".into()), now).unwrap()
                }
                FieldType::Bool | FieldType::Confirm => {
                    set_field_at(w, &path, FieldInput::Flag(true), now).unwrap()
                }
                FieldType::Checklist => {
                    let rows = w.store.get(&step.id).checklist(&spec.key).len();
                    for i in 0..rows {
                        let p = FieldPath::item(&step.id, &spec.key, i, "answer");
                        set_field_at(w, &p, FieldInput::Answer(Answer::Yes), now).unwrap();
                    }
                }
                FieldType::Signatories => {
                    let n = w.store.get(&step.id).signatories(&spec.key).len();
                    for i in 0..n {
                        let name = FieldPath::item(&step.id, &spec.key, i, "name");
                        let contact = FieldPath::item(&step.id, &spec.key, i, "contactNo");
                        set_field_at(w, &name, FieldInput::Text(format!("Person {i}")), now)
                            .unwrap();
                        set_field_at(w, &contact, FieldInput::Text(format!("555-010{i}")), now)
                            .unwrap();
                    }
                }
                FieldType::Comments => {
                    if spec.required {
                        append_comment(w, &step.id, &spec.key, "Noted", now).unwrap();
                    }
                }
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct CountingHandler {
    accepted: Mutex<Vec<PermitDraft>>,
}

impl CountingHandler {
    pub(crate) fn count(&self) -> usize {
        self.accepted.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub(crate) fn last(&self) -> Option<PermitDraft> {
        self.accepted.lock().ok().and_then(|a| a.last().cloned())
    }
}

impl SubmissionHandler for CountingHandler {
    fn accept(&self, draft: PermitDraft) -> Result<(), ReviewError> {
        if let Ok(mut a) = self.accepted.lock() {
            a.push(draft);
        }
        Ok(())
    }
}
