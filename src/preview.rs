// src/preview.rs

//! Read-only, print-oriented projection of a permit. Partially filled drafts render with
//! blanks; nothing here can fail.

use std::fmt::Write as _;

use crate::command::permit_wizard::{compute_progress, WizardState};
use crate::draft::{Answer, FieldValue, PermitDraft, PermitStatus, StepRecord};
use crate::review::ReviewFeedback;
use crate::template::{FieldSpec, FieldType, StepRegistry};

const BLANK: &str = "__________";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermitPreview {
    pub title: String,
    pub permit_id: String,
    pub status: PermitStatus,
    pub updated_at: Option<String>,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub sections: Vec<PreviewSection>,
    pub feedback: Vec<PreviewFeedback>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSection {
    pub step_id: String,
    pub name: String,
    pub complete: bool,
    pub lines: Vec<PreviewLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewLine {
    Field {
        label: String,
        value: String,
    },
    Flag {
        label: String,
        checked: bool,
    },
    Heading(String),
    ChecklistRow {
        id: u32,
        activity: String,
        answer: Answer,
        remarks: String,
    },
    Signatory {
        role: String,
        name: String,
        signed: bool,
        contact_no: String,
        date: String,
        time: String,
    },
    Comment {
        text: String,
        checked: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFeedback {
    pub from: String,
    pub posted_at: String,
    pub lines: Vec<String>,
}

pub fn build_preview(state: &WizardState) -> PermitPreview {
    project(&state.registry, state.store.draft(), &state.feedback)
}

pub fn project(
    registry: &StepRegistry,
    draft: &PermitDraft,
    feedback: &[ReviewFeedback],
) -> PermitPreview {
    let progress = compute_progress(registry, draft);
    let empty = StepRecord::default();

    let sections = registry
        .steps()
        .iter()
        .zip(progress.per_step.iter())
        .map(|(step, complete)| {
            let rec = draft
                .step_data
                .get(&step.id)
                .map(|r| r.as_ref())
                .unwrap_or(&empty);
            PreviewSection {
                step_id: step.id.clone(),
                name: step.name.clone(),
                complete: *complete,
                lines: step
                    .fields
                    .iter()
                    .flat_map(|spec| field_lines(spec, rec.get(&spec.key)))
                    .collect(),
            }
        })
        .collect();

    let feedback = feedback
        .iter()
        .map(|f| PreviewFeedback {
            from: f.from_role.label().to_string(),
            posted_at: f.posted_at.format("%Y-%m-%d %H:%M").to_string(),
            lines: f
                .entries
                .iter()
                .filter(|c| !c.text.trim().is_empty())
                .map(|c| c.text.clone())
                .collect(),
        })
        .collect();

    PermitPreview {
        title: registry.title().to_string(),
        permit_id: draft.permit_id.clone(),
        status: draft.status,
        updated_at: draft
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
        completed_steps: progress.completed,
        total_steps: progress.total,
        sections,
        feedback,
    }
}

fn field_lines(spec: &FieldSpec, value: Option<&FieldValue>) -> Vec<PreviewLine> {
    let label = spec.label.clone();
    match spec.field_type {
        FieldType::Text | FieldType::Date | FieldType::Time => {
            let value = match value {
                Some(FieldValue::Text(s)) => s.trim().to_string(),
                _ => String::new(),
            };
            vec![PreviewLine::Field { label, value }]
        }
        FieldType::Bool | FieldType::Confirm => {
            let checked = matches!(value, Some(FieldValue::Bool(true)));
            vec![PreviewLine::Flag { label, checked }]
        }
        FieldType::Checklist => {
            let mut out = vec![PreviewLine::Heading(label)];
            if let Some(FieldValue::Checklist(rows)) = value {
                out.extend(rows.iter().map(|r| PreviewLine::ChecklistRow {
                    id: r.id,
                    activity: r.activity.clone(),
                    answer: r.answer,
                    remarks: r.remarks.clone(),
                }));
            }
            out
        }
        FieldType::Signatories => {
            let mut out = vec![PreviewLine::Heading(label)];
            if let Some(FieldValue::Signatories(blocks)) = value {
                out.extend(blocks.iter().map(|b| PreviewLine::Signatory {
                    role: b.role.clone(),
                    name: b.name.clone(),
                    signed: b.is_signed(),
                    contact_no: b.contact_no.clone(),
                    date: b.date.clone(),
                    time: b.time.clone(),
                }));
            }
            out
        }
        FieldType::Comments => {
            let mut out = vec![PreviewLine::Heading(label)];
            if let Some(FieldValue::Comments(entries)) = value {
                out.extend(
                    entries
                        .iter()
                        .filter(|c| !c.text.trim().is_empty())
                        .map(|c| PreviewLine::Comment {
                            text: c.text.clone(),
                            checked: c.checked,
                        }),
                );
            }
            out
        }
    }
}

fn or_blank(s: &str) -> &str {
    if s.trim().is_empty() {
        BLANK
    } else {
        s
    }
}

pub fn render_text(p: &PermitPreview) -> String {
    let mut out = String::new();

    let status = match p.status {
        PermitStatus::Draft => "DRAFT",
        PermitStatus::Submitted => "SUBMITTED",
    };
    let _ = writeln!(out, "{}", p.title);
    let _ = writeln!(out, "{}", "=".repeat(p.title.chars().count().max(8)));
    let _ = writeln!(out, "Permit no.: {}    Status: {}", p.permit_id, status);
    let _ = writeln!(
        out,
        "Last saved: {}    Steps complete: {}/{}",
        p.updated_at.as_deref().unwrap_or(BLANK),
        p.completed_steps,
        p.total_steps
    );

    for (n, s) in p.sections.iter().enumerate() {
        let _ = writeln!(out);
        let mark = if s.complete { "" } else { "  (incomplete)" };
        let _ = writeln!(out, "{}. {}{}", n + 1, s.name, mark);
        let _ = writeln!(out, "{}", "-".repeat(40));

        for line in s.lines.iter() {
            match line {
                PreviewLine::Field { label, value } => {
                    let _ = writeln!(out, "  {label}: {}", or_blank(value));
                }
                PreviewLine::Flag { label, checked } => {
                    let _ = writeln!(out, "  [{}] {label}", if *checked { "x" } else { " " });
                }
                PreviewLine::Heading(label) => {
                    let _ = writeln!(out, "  {label}");
                }
                PreviewLine::ChecklistRow {
                    id,
                    activity,
                    answer,
                    remarks,
                } => {
                    let _ = write!(out, "  {id:>3}. {activity:<44} {:<4}", answer.label());
                    if !remarks.trim().is_empty() {
                        let _ = write!(out, " {remarks}");
                    }
                    let _ = writeln!(out);
                }
                PreviewLine::Signatory {
                    role,
                    name,
                    signed,
                    contact_no,
                    date,
                    time,
                } => {
                    let _ = writeln!(
                        out,
                        "  {role}: {}  sign: {}  contact: {}  {} {}",
                        or_blank(name),
                        if *signed { "[signed]" } else { BLANK },
                        or_blank(contact_no),
                        date,
                        time
                    );
                }
                PreviewLine::Comment { text, checked } => {
                    let _ = writeln!(out, "   - [{}] {text}", if *checked { "x" } else { " " });
                }
            }
        }
    }

    if !p.feedback.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Review feedback");
        let _ = writeln!(out, "{}", "-".repeat(40));
        for f in p.feedback.iter() {
            let _ = writeln!(out, "  {} ({}):", f.from, f.posted_at);
            for l in f.lines.iter() {
                let _ = writeln!(out, "   - {l}");
            }
        }
    }

    out
}

// ======================================================
// Unit Tests
// ======================================================
