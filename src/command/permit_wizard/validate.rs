// src/command/permit_wizard/validate.rs

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{NaiveDate, NaiveTime};

use crate::draft::{FieldValue, PermitDraft, StepRecord};
use crate::template::{FieldSpec, FieldType, StepRegistry, StepTemplate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// One field-level problem, ready to show next to the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub step_id: String,
    pub field: String,
    pub label: String,
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.step_id, self.label, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step_id: String,
    pub errors: Vec<FieldError>,
}

impl StepReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

trait ValidationSink {
    fn field_error(&mut self, spec: &FieldSpec, message: String);

    fn stop_early(&self) -> bool;
}

/// Boolean verdict; stops at the first problem.
struct VerdictSink {
    failed: bool,
}

impl ValidationSink for VerdictSink {
    fn field_error(&mut self, _spec: &FieldSpec, _message: String) {
        self.failed = true;
    }

    fn stop_early(&self) -> bool {
        self.failed
    }
}

struct ReportSink {
    step_id: String,
    errors: Vec<FieldError>,
}

impl ValidationSink for ReportSink {
    fn field_error(&mut self, spec: &FieldSpec, message: String) {
        self.errors.push(FieldError {
            step_id: self.step_id.clone(),
            field: spec.key.clone(),
            label: spec.label.clone(),
            message,
        });
    }

    fn stop_early(&self) -> bool {
        false
    }
}

/// Full field-level report for one step. Pure function of the step's data.
pub fn validate_step(step: &StepTemplate, rec: &StepRecord) -> StepReport {
    let mut sink = ReportSink {
        step_id: step.id.clone(),
        errors: Vec::new(),
    };
    validate_fields(step, rec, &mut sink);
    StepReport {
        step_id: step.id.clone(),
        errors: sink.errors,
    }
}

pub fn step_is_complete(step: &StepTemplate, rec: &StepRecord) -> bool {
    let mut sink = VerdictSink { failed: false };
    validate_fields(step, rec, &mut sink);
    !sink.failed
}

/// Reports for every failing step, in registry order.
pub fn validate_document(registry: &StepRegistry, draft: &PermitDraft) -> Vec<StepReport> {
    let empty = StepRecord::default();
    registry
        .steps()
        .iter()
        .map(|step| {
            let rec = draft
                .step_data
                .get(&step.id)
                .map(|r| r.as_ref())
                .unwrap_or(&empty);
            validate_step(step, rec)
        })
        .filter(|r| !r.is_complete())
        .collect()
}

fn validate_fields(step: &StepTemplate, rec: &StepRecord, sink: &mut impl ValidationSink) {
    for spec in step.fields.iter() {
        check_field(spec, rec, sink);
        if sink.stop_early() {
            return;
        }
    }
}

fn check_field(spec: &FieldSpec, rec: &StepRecord, sink: &mut impl ValidationSink) {
    let value = rec.get(&spec.key);

    match spec.field_type {
        FieldType::Text | FieldType::Date | FieldType::Time => {
            let s = match value {
                None => "",
                Some(FieldValue::Text(s)) => s.as_str(),
                Some(other) => {
                    sink.field_error(spec, wrong_kind(other));
                    return;
                }
            };
            if s.trim().is_empty() {
                if spec.required {
                    sink.field_error(spec, "is required".to_string());
                }
                return;
            }
            if let Err(msg) = check_text_format(spec.field_type, s.trim()) {
                sink.field_error(spec, msg);
                return;
            }
            if let Err(msg) = apply_validators_text(spec, s.trim(), rec) {
                sink.field_error(spec, msg);
            }
        }

        FieldType::Bool => match value {
            None if spec.required => sink.field_error(spec, "is required".to_string()),
            None | Some(FieldValue::Bool(_)) => {}
            Some(other) => sink.field_error(spec, wrong_kind(other)),
        },

        FieldType::Confirm => match value {
            Some(FieldValue::Bool(true)) => {}
            None | Some(FieldValue::Bool(false)) => {
                if spec.required {
                    sink.field_error(spec, "must be confirmed".to_string());
                }
            }
            Some(other) => sink.field_error(spec, wrong_kind(other)),
        },

        FieldType::Checklist => {
            let rows = match value {
                None => &[][..],
                Some(FieldValue::Checklist(rows)) => rows.as_slice(),
                Some(other) => {
                    sink.field_error(spec, wrong_kind(other));
                    return;
                }
            };
            if !spec.required {
                return;
            }
            // zero rows never passes; avoids a vacuous "all answered"
            if rows.is_empty() {
                sink.field_error(spec, "has no rows".to_string());
                return;
            }
            let unanswered: Vec<String> = rows
                .iter()
                .filter(|r| r.answer == crate::draft::Answer::Empty)
                .map(|r| r.id.to_string())
                .collect();
            if !unanswered.is_empty() {
                sink.field_error(
                    spec,
                    format!(
                        "{} of {} rows unanswered (#{})",
                        unanswered.len(),
                        rows.len(),
                        unanswered.join(", #")
                    ),
                );
            }
        }

        FieldType::Signatories => {
            let blocks = match value {
                None => &[][..],
                Some(FieldValue::Signatories(blocks)) => blocks.as_slice(),
                Some(other) => {
                    sink.field_error(spec, wrong_kind(other));
                    return;
                }
            };
            if spec.required && blocks.is_empty() {
                sink.field_error(spec, "has no signatories".to_string());
                return;
            }
            for b in blocks {
                if b.is_signed() && !is_image_data_uri(&b.signature_image) {
                    sink.field_error(
                        spec,
                        format!("{}: signature is not a valid image data URI", b.role),
                    );
                    if sink.stop_early() {
                        return;
                    }
                }
                if !spec.required {
                    continue;
                }
                if b.name.trim().is_empty() {
                    sink.field_error(spec, format!("{}: name is required", b.role));
                    if sink.stop_early() {
                        return;
                    }
                }
                if !b.is_signed() && b.contact_no.trim().is_empty() {
                    sink.field_error(
                        spec,
                        format!("{}: signature or contact number is required", b.role),
                    );
                    if sink.stop_early() {
                        return;
                    }
                }
            }
        }

        FieldType::Comments => {
            let entries = match value {
                None => &[][..],
                Some(FieldValue::Comments(entries)) => entries.as_slice(),
                Some(other) => {
                    sink.field_error(spec, wrong_kind(other));
                    return;
                }
            };
            if spec.required && entries.iter().all(|c| c.text.trim().is_empty()) {
                sink.field_error(spec, "needs at least one comment".to_string());
            }
        }
    }
}

fn wrong_kind(v: &FieldValue) -> String {
    format!("holds a {} value of the wrong kind", v.kind_name())
}

fn check_text_format(field_type: FieldType, s: &str) -> Result<(), String> {
    match field_type {
        FieldType::Date => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(|_| ())
            .map_err(|_| "must be a date (YYYY-MM-DD)".to_string()),
        FieldType::Time => NaiveTime::parse_from_str(s, TIME_FORMAT)
            .map(|_| ())
            .map_err(|_| "must be a time (HH:MM)".to_string()),
        _ => Ok(()),
    }
}

fn apply_validators_text(spec: &FieldSpec, s: &str, rec: &StepRecord) -> Result<(), String> {
    let Some(vs) = spec.validators.as_deref() else {
        return Ok(());
    };

    for rule in vs.iter() {
        if rule == "number" {
            if s.parse::<f64>().map(|n| !n.is_finite()).unwrap_or(true) {
                return Err("must be a number".to_string());
            }
        } else if let Some(pat) = rule.strip_prefix("regex:") {
            let matched = match spec.pattern(pat) {
                Some(re) => re.is_match(s),
                None => regex::Regex::new(pat)
                    .map_err(|e| format!("template error: invalid regex: {e}"))?
                    .is_match(s),
            };
            if !matched {
                return Err("does not match the expected format".to_string());
            }
        } else if let Some(n) = rule.strip_prefix("min_len:") {
            let n = n
                .parse::<usize>()
                .map_err(|_| format!("template error: invalid rule '{rule}'"))?;
            if s.chars().count() < n {
                return Err(format!("must be at least {n} chars"));
            }
        } else if let Some(n) = rule.strip_prefix("max_len:") {
            let n = n
                .parse::<usize>()
                .map_err(|_| format!("template error: invalid rule '{rule}'"))?;
            if s.chars().count() > n {
                return Err(format!("must be at most {n} chars"));
            }
        } else if let Some(other) = rule.strip_prefix("not_before:") {
            let Ok(this) = NaiveDate::parse_from_str(s, DATE_FORMAT) else {
                continue;
            };
            // ordering is only checked once the other date is valid
            let Ok(earliest) = NaiveDate::parse_from_str(rec.text(other).trim(), DATE_FORMAT)
            else {
                continue;
            };
            if this < earliest {
                return Err(format!("must not be before {other}"));
            }
        } else {
            return Err(format!("template error: unknown rule '{rule}'"));
        }
    }

    Ok(())
}

/// `data:image/<type>;base64,<payload>` with a decodable, non-empty payload.
pub fn is_image_data_uri(s: &str) -> bool {
    let Some(rest) = s.trim().strip_prefix("data:image/") else {
        return false;
    };
    let Some((mime_tail, payload)) = rest.split_once(',') else {
        return false;
    };
    let Some(subtype) = mime_tail.strip_suffix(";base64") else {
        return false;
    };
    if subtype.is_empty() || payload.is_empty() {
        return false;
    }
    B64.decode(payload).map(|b| !b.is_empty()).unwrap_or(false)
}

// ======================================================
// Unit Tests
// ======================================================
