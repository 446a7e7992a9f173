// tests/restart_persistence.rs

mod common;

use std::sync::Arc;
use std::time::Instant;

use common::{complete_all, fill_ht_basic, persistence_on, RecordingHandler};
use permitflow_lib::command::permit_wizard::{close_wizard, open_wizard, step_next, NavOutcome};
use permitflow_lib::persistence::{AutosavePolicy, FsStorage, SaveOutcome};
use permitflow_lib::review::{LocalRegister, ReviewChannel, ReviewFeedback};
use permitflow_lib::draft::CommentEntry;
use permitflow_lib::save_log::recent_save_events;
use permitflow_lib::template::PermitKind;
use permitflow_lib::types::{AppState, Role};

#[test]
fn restart_resumes_draft_and_save_log() {
    // Keep tempdirs alive for whole test.
    let td = tempfile::tempdir().expect("tempdir");
    let drafts = td.path().join("drafts");
    let now = Instant::now();

    // ----- First run -----
    let state1 = Arc::new(AppState::new_for_tests(td.path()).expect("init_state"));
    let p1 = persistence_on(
        Arc::new(FsStorage::new(&drafts)),
        state1.clone(),
        PermitKind::Ht,
    );
    let mut w1 = open_wizard(
        p1,
        "HT-400",
        Role::Requester,
        Vec::new(),
        AutosavePolicy::default(),
    )
    .expect("open");
    fill_ht_basic(&mut w1, now);
    let rev1 = w1.store.revision();
    assert_eq!(close_wizard(&mut w1, now), Some(SaveOutcome::Written));

    // a load failure is remembered across restarts
    std::fs::write(drafts.join("htPermitDraft-HT-401.json"), "garbage").unwrap();
    let _ = w1.persistence.load("HT-401");
    assert_eq!(recent_save_events(&state1).len(), 1);

    // ----- "Restart": new AppState, same data dir -----
    drop(w1);
    drop(state1);

    let state2 = Arc::new(AppState::new_for_tests(td.path()).expect("init_state 2"));
    assert_eq!(recent_save_events(&state2).len(), 1);

    let p2 = persistence_on(
        Arc::new(FsStorage::new(&drafts)),
        state2.clone(),
        PermitKind::Ht,
    );
    let mut ids = p2.list_ids();
    ids.sort();
    assert_eq!(ids, vec!["HT-400".to_string(), "HT-401".to_string()]);

    let mut w2 = open_wizard(
        p2,
        "HT-400",
        Role::Requester,
        Vec::new(),
        AutosavePolicy::default(),
    )
    .expect("reopen");
    assert!(w2.restored);
    assert_eq!(w2.store.revision(), rev1);
    assert_eq!(w2.progress.completed, 1);
    assert_eq!(w2.store.get("basic").text("voltageLevel"), "11 kV");

    let h = RecordingHandler::default();
    assert_eq!(step_next(&mut w2, &h, now).unwrap(), NavOutcome::Moved(1));
}

#[test]
fn register_keeps_submissions_and_feedback_across_restart() {
    let td = tempfile::tempdir().expect("tempdir");
    let now = Instant::now();
    let state = Arc::new(AppState::new_for_tests(td.path()).expect("init_state"));

    {
        let register = LocalRegister::new(Arc::new(FsStorage::new(td.path().join("register"))));
        let p = persistence_on(
            Arc::new(FsStorage::new(td.path().join("drafts"))),
            state.clone(),
            PermitKind::Gas,
        );
        let mut w = open_wizard(
            p,
            "GAS-402",
            Role::Requester,
            Vec::new(),
            AutosavePolicy::default(),
        )
        .unwrap();
        complete_all(&mut w, now);
        assert_eq!(
            permitflow_lib::command::permit_wizard::submit(&mut w, &register, now).unwrap(),
            NavOutcome::Submitted
        );

        register
            .post(
                "GAS-402",
                ReviewFeedback::new(
                    Role::SafetyOfficer,
                    vec![CommentEntry::new("Recheck LEL before hot work")],
                    chrono::Utc::now(),
                ),
            )
            .unwrap();
    }

    let register = LocalRegister::new(Arc::new(FsStorage::new(td.path().join("register"))));
    assert_eq!(register.submitted_ids(), vec!["GAS-402".to_string()]);
    assert!(register.submitted("GAS-402").unwrap().is_submitted());

    let feedback = register.feedback_for("GAS-402");
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0].entries[0].text, "Recheck LEL before hot work");
}
