// tests/draft_persistence.rs

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{answer_all, fill_ht_basic, persistence_on, set_text, TestEnv};
use permitflow_lib::command::permit_wizard::{
    autosave_tick, close_wizard, open_wizard, save_draft, validate_step,
};
use permitflow_lib::draft::Answer;
use permitflow_lib::persistence::{
    AutosavePolicy, DraftStorage, MemoryStorage, SaveOutcome, DEFAULT_DEBOUNCE,
};
use permitflow_lib::save_log::{recent_save_events, take_save_warn_pending, SaveEventClass};
use permitflow_lib::template::PermitKind;
use permitflow_lib::types::{AppState, Role};

#[test]
fn saved_draft_reloads_identically() {
    let env = TestEnv::new();
    let mut w = env.open(PermitKind::Ht, "HT-200", Role::Requester);
    let now = Instant::now();
    fill_ht_basic(&mut w, now);

    assert_eq!(save_draft(&mut w, now).unwrap(), SaveOutcome::Written);

    let loaded = env
        .persistence(PermitKind::Ht)
        .load("HT-200")
        .expect("draft on disk");
    assert_eq!(&loaded, w.store.draft());
    assert!(env.storage.dir().join("htPermitDraft-HT-200.json").is_file());
}

#[test]
fn corrupt_record_is_treated_as_absent() {
    let env = TestEnv::new();
    env.storage
        .set_item("htPermitDraft-HT-201", "{ not json")
        .unwrap();

    let w = env.open(PermitKind::Ht, "HT-201", Role::Requester);
    assert!(!w.restored);
    assert_eq!(w.progress.completed, 0);

    let events = recent_save_events(&env.state);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].class, SaveEventClass::LoadFailure);
    assert_eq!(events[0].kind, "corrupt");
    // load problems do not raise the save warning
    assert!(!take_save_warn_pending(&env.state));
}

#[test]
fn late_periodic_save_does_not_overwrite_newer_data() {
    let env = TestEnv::new();
    let persistence = env.persistence(PermitKind::Ht);
    let mut w = env.open(PermitKind::Ht, "HT-202", Role::Requester);
    let now = Instant::now();

    set_text(&mut w, "basic", "substation", "SS-old", now);
    let older = w.store.snapshot();

    set_text(&mut w, "basic", "substation", "SS-new", now);
    let newer = w.store.snapshot();

    let a = std::thread::spawn({
        let p = persistence.clone();
        move || p.save(&newer, "reactive")
    });
    let newer_outcome = a.join().unwrap();
    let older_outcome = persistence.save(&older, "periodic");

    assert_eq!(newer_outcome, SaveOutcome::Written);
    assert_eq!(older_outcome, SaveOutcome::SkippedStale);

    let stored = persistence.load("HT-202").unwrap();
    assert_eq!(stored.step_data["basic"].text("substation"), "SS-new");
}

#[test]
fn quota_failure_is_swallowed_and_logged() {
    let mem = Arc::new(MemoryStorage::with_quota(64));
    let app = Arc::new(AppState::in_memory());
    let persistence = persistence_on(mem.clone(), app.clone(), PermitKind::Gas);

    let mut w = open_wizard(
        persistence,
        "GAS-9",
        Role::Requester,
        Vec::new(),
        AutosavePolicy::default(),
    )
    .unwrap();

    let t0 = Instant::now();
    set_text(&mut w, "basic", "jobDescription", "Hot tap on main", t0);

    let outcome = autosave_tick(&mut w, t0 + DEFAULT_DEBOUNCE + Duration::from_millis(1));
    assert_eq!(outcome, Some(SaveOutcome::Failed));
    assert!(w.autosaver.is_dirty());
    assert!(take_save_warn_pending(&app));
    assert_eq!(recent_save_events(&app)[0].kind, "quota");

    // the edit is still in memory and a later save succeeds once space frees up
    mem.set_quota(None);
    assert_eq!(save_draft(&mut w, t0).unwrap(), SaveOutcome::Written);
    assert!(!w.autosaver.is_dirty());
}

#[test]
fn truncated_checklist_is_rebuilt_on_load() {
    let env = TestEnv::new();
    let now = Instant::now();

    let mut w = env.open(PermitKind::Ht, "HT-203", Role::Requester);
    answer_all(&mut w, "isolation", "checklist", now);
    assert_eq!(save_draft(&mut w, now).unwrap(), SaveOutcome::Written);
    close_wizard(&mut w, now);

    // drop row 7 from the stored record
    let text = env
        .storage
        .get_item("htPermitDraft-HT-203")
        .unwrap()
        .expect("stored");
    let mut json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let rows = json["stepData"]["isolation"]["checklist"]["value"]
        .as_array_mut()
        .expect("checklist rows");
    assert_eq!(rows.len(), 12);
    rows.remove(6);
    env.storage
        .set_item("htPermitDraft-HT-203", &json.to_string())
        .unwrap();

    let w = env.open(PermitKind::Ht, "HT-203", Role::Requester);
    assert!(w.restored);
    let rows = w.store.get("isolation").checklist("checklist").to_vec();
    assert_eq!(rows.len(), 12);
    assert_eq!(rows[6].id, 7);
    assert_eq!(rows[6].answer, Answer::Empty);
    assert_eq!(rows[5].answer, Answer::Yes);

    let step = w.registry.step_by_id("isolation").unwrap().clone();
    assert!(!validate_step(&step, &w.store.get("isolation")).is_complete());
}

#[test]
fn unloadable_record_does_not_block_a_fresh_draft() {
    let env = TestEnv::new();
    env.storage
        .set_item("htPermitDraft-HT-204", r#"{"permitId":5,"revision":99}"#)
        .unwrap();
    let now = Instant::now();

    let mut w = env.open(PermitKind::Ht, "HT-204", Role::Requester);
    assert!(!w.restored);
    set_text(&mut w, "basic", "substation", "SS-4", now);
    assert_eq!(save_draft(&mut w, now).unwrap(), SaveOutcome::Written);

    let stored = env.persistence(PermitKind::Ht).load("HT-204").expect("reloads");
    assert_eq!(stored.step_data["basic"].text("substation"), "SS-4");
    assert!(!take_save_warn_pending(&env.state));
}

#[test]
fn last_session_to_save_wins_and_warns() {
    let env = TestEnv::new();
    let now = Instant::now();

    let mut tab_a = env.open(PermitKind::Ht, "HT-205", Role::Requester);
    let mut tab_b = env.open(PermitKind::Ht, "HT-205", Role::Requester);

    for v in ["SS-a1", "SS-a2", "SS-a3"] {
        set_text(&mut tab_a, "basic", "substation", v, now);
    }
    assert_eq!(save_draft(&mut tab_a, now).unwrap(), SaveOutcome::Written);

    set_text(&mut tab_b, "basic", "substation", "SS-b", now);
    assert_eq!(save_draft(&mut tab_b, now).unwrap(), SaveOutcome::Written);
    assert!(!tab_b.autosaver.is_dirty());

    let stored = env.persistence(PermitKind::Ht).load("HT-205").unwrap();
    assert_eq!(stored.step_data["basic"].text("substation"), "SS-b");

    assert!(take_save_warn_pending(&env.state));
    let events = recent_save_events(&env.state);
    assert!(events
        .iter()
        .any(|e| e.class == SaveEventClass::SaveFailure && e.kind == "stale"));
}
