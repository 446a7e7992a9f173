// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Instant;

use permitflow_lib::command::permit_wizard::{
    append_comment, open_wizard, set_field_at, WizardState,
};
use permitflow_lib::draft::{Answer, FieldInput, FieldPath, PermitDraft};
use permitflow_lib::persistence::{AutosavePolicy, DraftPersistence, DraftStorage, FsStorage};
use permitflow_lib::review::{ReviewError, SubmissionHandler};
use permitflow_lib::template::{builtin_registry, FieldType, PermitKind};
use permitflow_lib::types::{AppState, Role};

pub struct TestEnv {
    // Keep tempdirs alive for the duration of the test.
    _td_state: tempfile::TempDir,

    pub state: Arc<AppState>,
    pub storage: Arc<FsStorage>,
}

impl TestEnv {
    pub fn new() -> Self {
        let td_state = tempfile::tempdir().expect("tempdir state");
        let state = AppState::new_for_tests(td_state.path()).expect("init_state");
        let storage = Arc::new(FsStorage::new(td_state.path().join("drafts")));

        Self {
            _td_state: td_state,
            state: Arc::new(state),
            storage,
        }
    }

    pub fn data_dir(&self) -> &std::path::Path {
        self._td_state.path()
    }

    pub fn persistence(&self, kind: PermitKind) -> Arc<DraftPersistence> {
        persistence_on(self.storage.clone(), self.state.clone(), kind)
    }

    pub fn open(&self, kind: PermitKind, permit_id: &str, role: Role) -> WizardState {
        open_wizard(
            self.persistence(kind),
            permit_id,
            role,
            Vec::new(),
            AutosavePolicy::default(),
        )
        .expect("open_wizard")
    }
}

pub fn persistence_on(
    storage: Arc<dyn DraftStorage>,
    state: Arc<AppState>,
    kind: PermitKind,
) -> Arc<DraftPersistence> {
    let registry = Arc::new(builtin_registry(kind).expect("builtin registry"));
    Arc::new(DraftPersistence::new(storage, registry, state))
}

pub fn set_text(w: &mut WizardState, step: &str, field: &str, v: &str, now: Instant) {
    set_field_at(
        w,
        &FieldPath::field(step, field),
        FieldInput::Text(v.to_string()),
        now,
    )
    .unwrap_or_else(|e| panic!("set {step}.{field}: {e}"));
}

/// Fills only the first step of an HT permit.
pub fn fill_ht_basic(w: &mut WizardState, now: Instant) {
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
        set_text(w, "basic", k, v, now);
    }
}

pub fn answer_all(w: &mut WizardState, step: &str, field: &str, now: Instant) {
    let rows = w.store.get(step).checklist(field).len();
    for i in 0..rows {
        set_field_at(
            w,
            &FieldPath::item(step, field, i, "answer"),
            FieldInput::Answer(Answer::Yes),
            now,
        )
        .expect("answer row");
    }
}

/// A valid value in every field of every step.
pub fn complete_all(w: &mut WizardState, now: Instant) {
    let registry = w.registry.clone();
    for step in registry.steps() {
        for spec in step.fields.iter() {
            let path = FieldPath::field(&step.id, &spec.key);
            let input = match spec.field_type {
                FieldType::Text => {
                    let rules = spec.validators.clone().unwrap_or_default();
                    if rules.iter().any(|r| r == "number") {
                        FieldInput::Text("1".into())
                    } else if rules.iter().any(|r| r.starts_with("regex:")) {
                        FieldInput::Text("11 kV".into())
                    } else {
                        FieldInput::Text("Sample entry".into())
                    }
                }
                FieldType::Date => FieldInput::Text("2026-03-10".into()),
                FieldType::Time => FieldInput::Text("08:30".into()),
                FieldType::Bool | FieldType::Confirm => FieldInput::Flag(true),
                FieldType::Checklist => {
                    answer_all(w, &step.id, &spec.key, now);
                    continue;
                }
                FieldType::Signatories => {
                    let n = w.store.get(&step.id).signatories(&spec.key).len();
                    for i in 0..n {
                        for (col, v) in [("name", format!("Person {i}")), ("contactNo", format!("555-010{i}"))] {
                            set_field_at(
                                w,
                                &FieldPath::item(&step.id, &spec.key, i, col),
                                FieldInput::Text(v),
                                now,
                            )
                            .expect("signatory");
                        }
                    }
                    continue;
                }
                FieldType::Comments => {
                    if spec.required {
                        append_comment(w, &step.id, &spec.key, "Noted", now).expect("comment");
                    }
                    continue;
                }
            };
            set_field_at(w, &path, input, now).expect("set field");
        }
    }
}

#[derive(Default)]
pub struct RecordingHandler {
    pub accepted: Mutex<Vec<PermitDraft>>,
}

impl RecordingHandler {
    pub fn count(&self) -> usize {
        self.accepted.lock().expect("lock").len()
    }
}

impl SubmissionHandler for RecordingHandler {
    fn accept(&self, draft: PermitDraft) -> Result<(), ReviewError> {
        self.accepted.lock().expect("lock").push(draft);
        Ok(())
    }
}
