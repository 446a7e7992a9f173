// src/cli/repl.rs

//! Line-oriented wizard session. One command per line; autosave runs between commands.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use permitflow_lib::command::permit_wizard::{
    append_comment, autosave_tick, close_wizard, current_step, jump_to, jump_to_id, open_wizard,
    save_draft, set_field_from_str, step_back, step_next, submit, visible_steps, FieldError,
    NavOutcome, WizardState,
};
use permitflow_lib::context::WizardConfig;
use permitflow_lib::error::AppResult;
use permitflow_lib::persistence::{DraftPersistence, SaveOutcome};
use permitflow_lib::preview::{build_preview, render_text};
use permitflow_lib::review::{LocalRegister, ReviewChannel};

const HELP: &str = "\
commands:
  show                      current step with its values
  steps                     step list with completion
  set <path> <value>        e.g. set basic.startDate 2026-03-10
                                 set isolation.checklist.0.answer yes
  note <step.field> <text>  append a comment entry
  next | back               move one step (next validates the current step)
  jump <n|step-id>          go to any step
  errors                    field errors from the last next/submit
  save                      save the draft now
  submit                    validate everything and submit
  preview                   printable view
  quit                      save and leave";

pub fn run(
    persistence: Arc<DraftPersistence>,
    register: LocalRegister,
    permit_id: &str,
    cfg: WizardConfig,
) -> AppResult<()> {
    let role = persistence.acting_role();
    let feedback = register.feedback_for(permit_id);
    let mut w = open_wizard(persistence, permit_id, role, feedback, cfg.autosave)?;

    println!(
        "{} {}  ({} as {})",
        w.registry.title(),
        permit_id,
        if w.restored { "resumed" } else { "new draft" },
        role.label()
    );
    if w.pinned.is_some() {
        println!("Your role can only work on this step.");
    }
    print_step(&w);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}> ", step_prompt(&w));
        let _ = io::stdout().flush();

        let Some(line) = lines.next() else { break };
        let line = line?;
        let now = Instant::now();

        // a save that came due while waiting on input
        report_save(autosave_tick(&mut w, now));

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match cmd {
            "help" | "?" => println!("{HELP}"),
            "show" => print_step(&w),
            "steps" => print_steps(&w),
            "set" => match rest.split_once(' ') {
                Some((path, value)) => {
                    if let Err(e) = set_field_from_str(&mut w, path, value.trim(), now) {
                        println!("  ! {e}");
                    }
                }
                None => println!("  usage: set <path> <value>"),
            },
            "note" => match rest.split_once(' ').and_then(|(p, t)| {
                p.split_once('.').map(|(step, field)| (step, field, t))
            }) {
                Some((step, field, text)) => {
                    if let Err(e) = append_comment(&mut w, step, field, text, now) {
                        println!("  ! {e}");
                    }
                }
                None => println!("  usage: note <step.field> <text>"),
            },
            "next" => match step_next(&mut w, &register, now) {
                Ok(outcome) => {
                    report_nav(&outcome);
                    if matches!(outcome, NavOutcome::Moved(_)) {
                        print_step(&w);
                    }
                }
                Err(e) => println!("  ! {e}"),
            },
            "back" => match step_back(&mut w) {
                Ok(outcome) => {
                    report_nav(&outcome);
                    print_step(&w);
                }
                Err(e) => println!("  ! {e}"),
            },
            "jump" => {
                let r = match rest.parse::<usize>() {
                    Ok(n) if n >= 1 => jump_to(&mut w, n - 1),
                    _ => jump_to_id(&mut w, rest),
                };
                match r {
                    Ok(outcome) => {
                        report_nav(&outcome);
                        print_step(&w);
                    }
                    Err(e) => println!("  ! {e}"),
                }
            }
            "errors" => print_errors(&w.last_errors),
            "save" => match save_draft(&mut w, now) {
                Ok(outcome) => report_save(Some(outcome)),
                Err(e) => println!("  ! {e}"),
            },
            "submit" => match submit(&mut w, &register, now) {
                Ok(outcome) => report_nav(&outcome),
                Err(e) => println!("  ! {e}"),
            },
            "preview" => print!("{}", render_text(&build_preview(&w))),
            "quit" | "exit" | "q" => break,
            other => println!("  unknown command '{other}' (try 'help')"),
        }

        report_save(autosave_tick(&mut w, Instant::now()));
    }

    if let Some(outcome) = close_wizard(&mut w, Instant::now()) {
        report_save(Some(outcome));
    }
    Ok(())
}

fn step_prompt(w: &WizardState) -> String {
    let id = w.registry.id_at(w.current).unwrap_or("?");
    let dirty = if w.autosaver.is_dirty() { "*" } else { "" };
    format!(
        "[{}/{} {}{}] {}%",
        w.current + 1,
        w.registry.len(),
        id,
        dirty,
        w.progress.percent()
    )
}

fn print_step(w: &WizardState) {
    let Ok(step) = current_step(w) else { return };
    let preview = build_preview(w);
    println!();
    println!("== {} ==", step.name);
    if !step.desc.is_empty() {
        println!("{}", step.desc);
    }
    for spec in step.fields.iter() {
        let req = if spec.required { " *" } else { "" };
        println!("  {}.{}{}  ({:?})", step.id, spec.key, req, spec.field_type);
    }
    if let Some(section) = preview.sections.iter().find(|s| s.step_id == step.id) {
        let single = permitflow_lib::preview::PermitPreview {
            sections: vec![section.clone()],
            feedback: Vec::new(),
            ..preview.clone()
        };
        // body only; the header is shown by the prompt
        for line in render_text(&single).lines().skip(4) {
            println!("{line}");
        }
    }
    if !w.feedback.is_empty() {
        println!("  ({} review comment(s); 'preview' shows them)", w.feedback.len());
    }
}

fn print_steps(w: &WizardState) {
    for def in visible_steps(w) {
        let i = w.registry.index_of(&def.id).unwrap_or(0);
        let done = w.progress.per_step.get(i).copied().unwrap_or(false);
        let here = if i == w.current { ">" } else { " " };
        let mark = if done { "x" } else { " " };
        println!("{here} [{mark}] {}. {}", i + 1, def.name);
    }
    println!(
        "  {}/{} steps complete",
        w.progress.completed, w.progress.total
    );
}

fn print_errors(errors: &[FieldError]) {
    if errors.is_empty() {
        println!("  no errors");
    }
    for e in errors {
        println!("  - {e}");
    }
}

fn report_nav(outcome: &NavOutcome) {
    match outcome {
        NavOutcome::Moved(_) => {}
        NavOutcome::Blocked(errors) => {
            println!("  This step is not complete:");
            print_errors(errors);
        }
        NavOutcome::Rejected(errors) => {
            println!("  Cannot submit yet:");
            print_errors(errors);
        }
        NavOutcome::Submitted => println!("  Permit submitted."),
        NavOutcome::Pinned => println!("  Your role is limited to this step."),
    }
}

fn report_save(outcome: Option<SaveOutcome>) {
    match outcome {
        Some(SaveOutcome::Failed) => println!("  (draft could not be saved; will retry)"),
        Some(SaveOutcome::SkippedStale) => {
            println!("  (another session saved this draft; will retry)")
        }
        Some(SaveOutcome::Written) | None => {}
    }
}
