// tests/permit_wizard_basic.rs

mod common;

use std::time::Instant;

use common::{answer_all, complete_all, fill_ht_basic, RecordingHandler, TestEnv};
use permitflow_lib::command::permit_wizard::{
    jump_to, set_field_at, step_back, step_next, submit, validate_step, NavOutcome,
};
use permitflow_lib::draft::{Answer, FieldInput, FieldPath, PermitStatus};
use permitflow_lib::template::PermitKind;
use permitflow_lib::types::Role;

#[test]
fn fresh_draft_starts_at_zero() {
    let env = TestEnv::new();
    let w = env.open(PermitKind::Ht, "HT-100", Role::Requester);

    assert_eq!(w.current, 0);
    assert_eq!(w.progress.completed, 0);
    assert!(!w.restored);
    let ids: Vec<&str> = w.store.draft().step_data.keys().map(String::as_str).collect();
    assert_eq!(
        ids,
        vec!["basic", "earthing", "isolation", "review", "signatures"]
    );
}

#[test]
fn filling_first_step_unlocks_next_and_back_keeps_data() {
    let env = TestEnv::new();
    let mut w = env.open(PermitKind::Ht, "HT-101", Role::Requester);
    let h = RecordingHandler::default();
    let now = Instant::now();

    fill_ht_basic(&mut w, now);
    assert_eq!(w.progress.completed, 1);

    assert_eq!(step_next(&mut w, &h, now).unwrap(), NavOutcome::Moved(1));
    assert_eq!(step_back(&mut w).unwrap(), NavOutcome::Moved(0));
    assert_eq!(w.store.get("basic").text("substation"), "SS-2");

    // back at 0 stays at 0
    assert_eq!(step_back(&mut w).unwrap(), NavOutcome::Moved(0));
}

#[test]
fn checklist_needs_every_row_answered() {
    let env = TestEnv::new();
    let mut w = env.open(PermitKind::Gas, "GAS-7", Role::Requester);
    let now = Instant::now();

    answer_all(&mut w, "checklist", "checklist", now);
    let step = w.registry.step_by_id("checklist").unwrap().clone();
    assert!(validate_step(&step, &w.store.get("checklist")).is_complete());

    set_field_at(
        &mut w,
        &FieldPath::item("checklist", "checklist", 11, "answer"),
        FieldInput::Answer(Answer::Empty),
        now,
    )
    .unwrap();
    let report = validate_step(&step, &w.store.get("checklist"));
    assert!(!report.is_complete());
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn jumping_ignores_completion_but_next_does_not() {
    let env = TestEnv::new();
    let mut w = env.open(PermitKind::General, "GEN-3", Role::Requester);
    let h = RecordingHandler::default();
    let now = Instant::now();

    assert_eq!(jump_to(&mut w, 3).unwrap(), NavOutcome::Moved(3));
    assert!(matches!(
        step_next(&mut w, &h, now).unwrap(),
        NavOutcome::Blocked(_)
    ));
    assert_eq!(w.current, 3);
    assert!(jump_to(&mut w, 9).is_err());
}

#[test]
fn submit_hands_off_once_and_persists_status() {
    let env = TestEnv::new();
    let mut w = env.open(PermitKind::General, "GEN-4", Role::Requester);
    let h = RecordingHandler::default();
    let now = Instant::now();

    assert!(matches!(
        submit(&mut w, &h, now).unwrap(),
        NavOutcome::Rejected(_)
    ));
    assert_eq!(h.count(), 0);

    complete_all(&mut w, now);
    assert_eq!(w.progress.completed, w.progress.total);
    assert_eq!(submit(&mut w, &h, now).unwrap(), NavOutcome::Submitted);
    assert_eq!(h.count(), 1);
    assert!(submit(&mut w, &h, now).is_err());
    assert_eq!(h.count(), 1);

    let stored = env
        .persistence(PermitKind::General)
        .load("GEN-4")
        .expect("stored draft");
    assert_eq!(stored.status, PermitStatus::Submitted);
    assert!(stored.updated_at.is_some());
}
