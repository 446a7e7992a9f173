// src/draft/model.rs

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::template::{FieldSpec, FieldType, StepRegistry, StepTemplate};

pub const PERMIT_ID_MAX_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    #[default]
    Draft,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Answer {
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "na")]
    Na,
    #[default]
    #[serde(rename = "")]
    Empty,
}

impl Answer {
    pub fn parse(s: &str) -> Option<Answer> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Some(Answer::Yes),
            "na" | "n/a" => Some(Answer::Na),
            "" | "-" | "empty" => Some(Answer::Empty),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::Na => "N/A",
            Answer::Empty => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistRow {
    /// 1-based position in the template's activity list.
    pub id: u32,
    pub activity: String,
    #[serde(default)]
    pub answer: Answer,
    #[serde(default)]
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatoryBlock {
    pub role: String,
    #[serde(default)]
    pub name: String,
    /// data-URI or empty
    #[serde(default)]
    pub signature_image: String,
    #[serde(default)]
    pub contact_no: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
}

impl SignatoryBlock {
    pub fn for_role(role: &str) -> Self {
        Self {
            role: role.to_string(),
            ..Self::default()
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature_image.trim().is_empty()
    }
}

/// Comment record. Older drafts stored bare strings; those are normalized on load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawCommentEntry")]
pub struct CommentEntry {
    pub text: String,
    pub checked: bool,
}

impl CommentEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            checked: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCommentEntry {
    Plain(String),
    Checkable {
        text: String,
        #[serde(default)]
        checked: bool,
    },
}

impl From<RawCommentEntry> for CommentEntry {
    fn from(raw: RawCommentEntry) -> Self {
        match raw {
            RawCommentEntry::Plain(text) => CommentEntry {
                text,
                checked: false,
            },
            RawCommentEntry::Checkable { text, checked } => CommentEntry { text, checked },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Checklist(Vec<ChecklistRow>),
    Signatories(Vec<SignatoryBlock>),
    Comments(Vec<CommentEntry>),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "bool",
            FieldValue::Checklist(_) => "checklist",
            FieldValue::Signatories(_) => "signatories",
            FieldValue::Comments(_) => "comments",
        }
    }

    /// Whether this value has the shape `field_type` expects.
    pub fn fits(&self, field_type: FieldType) -> bool {
        match self {
            FieldValue::Text(_) => field_type.is_scalar_text(),
            FieldValue::Bool(_) => field_type.is_flag(),
            FieldValue::Checklist(_) => field_type == FieldType::Checklist,
            FieldValue::Signatories(_) => field_type == FieldType::Signatories,
            FieldValue::Comments(_) => field_type == FieldType::Comments,
        }
    }

    /// Seeded value for structured fields; scalar fields start unset.
    pub fn seed(spec: &FieldSpec) -> Option<FieldValue> {
        match spec.field_type {
            FieldType::Checklist => {
                let rows = spec
                    .activities
                    .iter()
                    .flatten()
                    .enumerate()
                    .map(|(i, a)| ChecklistRow {
                        id: (i + 1) as u32,
                        activity: a.clone(),
                        answer: Answer::Empty,
                        remarks: String::new(),
                    })
                    .collect();
                Some(FieldValue::Checklist(rows))
            }
            FieldType::Signatories => {
                let blocks = spec
                    .roles
                    .iter()
                    .flatten()
                    .map(|r| SignatoryBlock::for_role(r))
                    .collect();
                Some(FieldValue::Signatories(blocks))
            }
            FieldType::Comments => Some(FieldValue::Comments(Vec::new())),
            _ => None,
        }
    }
}

/// One step's field values, keyed by field key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepRecord {
    pub fields: BTreeMap<String, FieldValue>,
}

impl StepRecord {
    pub fn seeded(step: &StepTemplate) -> Self {
        let mut rec = StepRecord::default();
        rec.fill_missing(step);
        rec
    }

    /// Adds seeded defaults for structured fields that are absent. Returns true if anything changed.
    pub fn fill_missing(&mut self, step: &StepTemplate) -> bool {
        let mut changed = false;
        for spec in step.fields.iter() {
            if self.fields.contains_key(&spec.key) {
                continue;
            }
            if let Some(v) = FieldValue::seed(spec) {
                self.fields.insert(spec.key.clone(), v);
                changed = true;
            }
        }
        changed
    }

    /// Brings structured fields back to the template's shape: checklist rows follow
    /// `activities` (answers and remarks kept by row id), signatory blocks follow `roles`
    /// (kept by role), and structured values of the wrong kind are reseeded.
    /// Returns true if anything changed.
    pub fn reconcile(&mut self, step: &StepTemplate) -> bool {
        let mut changed = false;
        for spec in step.fields.iter() {
            let Some(seed) = FieldValue::seed(spec) else {
                continue;
            };

            let next = match (self.fields.get(&spec.key), seed) {
                (Some(FieldValue::Checklist(stored)), FieldValue::Checklist(rows)) => {
                    FieldValue::Checklist(
                        rows.into_iter()
                            .map(|mut row| {
                                if let Some(old) = stored.iter().find(|s| s.id == row.id) {
                                    row.answer = old.answer;
                                    row.remarks = old.remarks.clone();
                                }
                                row
                            })
                            .collect(),
                    )
                }
                (Some(FieldValue::Signatories(stored)), FieldValue::Signatories(blocks)) => {
                    let mut used = vec![false; stored.len()];
                    FieldValue::Signatories(
                        blocks
                            .into_iter()
                            .map(|seeded| {
                                let hit = stored
                                    .iter()
                                    .enumerate()
                                    .position(|(i, b)| !used[i] && b.role == seeded.role);
                                match hit {
                                    Some(i) => {
                                        used[i] = true;
                                        stored[i].clone()
                                    }
                                    None => seeded,
                                }
                            })
                            .collect(),
                    )
                }
                (Some(v), _) if v.fits(spec.field_type) => continue,
                (_, seed) => seed,
            };

            if self.fields.get(&spec.key) != Some(&next) {
                self.fields.insert(spec.key.clone(), next);
                changed = true;
            }
        }
        changed
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Text value, or "" when unset or not text.
    pub fn text(&self, key: &str) -> &str {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => s.as_str(),
            _ => "",
        }
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.fields.get(key) {
            Some(FieldValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn checklist(&self, key: &str) -> &[ChecklistRow] {
        match self.fields.get(key) {
            Some(FieldValue::Checklist(rows)) => rows,
            _ => &[],
        }
    }

    pub fn signatories(&self, key: &str) -> &[SignatoryBlock] {
        match self.fields.get(key) {
            Some(FieldValue::Signatories(blocks)) => blocks,
            _ => &[],
        }
    }

    pub fn comments(&self, key: &str) -> &[CommentEntry] {
        match self.fields.get(key) {
            Some(FieldValue::Comments(entries)) => entries,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitDraft {
    pub permit_id: String,
    /// Template id of the registry this draft was created from.
    pub permit_type: String,
    #[serde(default)]
    pub status: PermitStatus,
    #[serde(default)]
    pub step_data: BTreeMap<String, Arc<StepRecord>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Bumped on every user mutation; used to drop stale saves.
    #[serde(default)]
    pub revision: u64,
}

impl PermitDraft {
    pub fn new(registry: &StepRegistry, permit_id: &str) -> Self {
        let step_data = registry
            .steps()
            .iter()
            .map(|s| (s.id.clone(), Arc::new(StepRecord::seeded(s))))
            .collect();

        Self {
            permit_id: permit_id.to_string(),
            permit_type: registry.template_id().to_string(),
            status: PermitStatus::Draft,
            step_data,
            updated_at: None,
            revision: 0,
        }
    }

    /// Ensure an entry exists for every registry step and structured fields match the template.
    pub fn normalize(&mut self, registry: &StepRegistry) {
        for step in registry.steps() {
            match self.step_data.get_mut(&step.id) {
                Some(rec) => {
                    let mut fixed = rec.as_ref().clone();
                    if fixed.reconcile(step) {
                        *rec = Arc::new(fixed);
                    }
                }
                None => {
                    self.step_data
                        .insert(step.id.clone(), Arc::new(StepRecord::seeded(step)));
                }
            }
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.status == PermitStatus::Submitted
    }
}

pub fn validate_permit_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("permit id is empty".to_string());
    }
    if id.len() > PERMIT_ID_MAX_LEN {
        return Err(format!("permit id longer than {PERMIT_ID_MAX_LEN} chars"));
    }
    if !id
        .bytes()
        .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-'))
    {
        return Err(format!("permit id '{id}' may only contain [A-Za-z0-9_-]"));
    }
    Ok(())
}

/// e.g. "HT-3f9a1c2b04d1"
pub fn generate_permit_id(template_id: &str) -> String {
    let mut rnd = [0u8; 6];
    OsRng.fill_bytes(&mut rnd);
    format!("{}-{}", template_id.to_ascii_uppercase(), hex::encode(rnd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{builtin_registry, PermitKind};

    #[test]
    fn legacy_string_comments_are_normalized() {
        let json = r#"{"type":"comments","value":["plain", {"text":"boxed","checked":true}]}"#;
        let v: FieldValue = serde_json::from_str(json).unwrap();
        assert_eq!(
            v,
            FieldValue::Comments(vec![
                CommentEntry {
                    text: "plain".to_string(),
                    checked: false
                },
                CommentEntry {
                    text: "boxed".to_string(),
                    checked: true
                },
            ])
        );
    }

    #[test]
    fn empty_lists_keep_their_variant() {
        let v = FieldValue::Signatories(vec![]);
        let s = serde_json::to_string(&v).unwrap();
        let back: FieldValue = serde_json::from_str(&s).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn answer_serializes_as_short_strings() {
        assert_eq!(serde_json::to_string(&Answer::Yes).unwrap(), "\"yes\"");
        assert_eq!(serde_json::to_string(&Answer::Na).unwrap(), "\"na\"");
        assert_eq!(serde_json::to_string(&Answer::Empty).unwrap(), "\"\"");
        assert_eq!(Answer::parse("N/A"), Some(Answer::Na));
        assert_eq!(Answer::parse("maybe"), None);
    }

    #[test]
    fn new_draft_has_entry_for_every_step() {
        let reg = builtin_registry(PermitKind::Ht).unwrap();
        let d = PermitDraft::new(&reg, "HT-1");
        assert_eq!(d.step_data.len(), reg.len());
        for s in reg.steps() {
            assert!(d.step_data.contains_key(&s.id));
        }
        let rows = d.step_data["isolation"].checklist("checklist");
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[11].id, 12);
        assert!(rows.iter().all(|r| r.answer == Answer::Empty));
    }

    #[test]
    fn normalize_restores_missing_steps_and_fields() {
        let reg = builtin_registry(PermitKind::Gas).unwrap();
        let mut d = PermitDraft::new(&reg, "GAS-1");
        d.step_data.remove("checklist");
        Arc::make_mut(d.step_data.get_mut("signatures").unwrap())
            .fields
            .clear();

        d.normalize(&reg);
        assert_eq!(d.step_data["checklist"].checklist("checklist").len(), 12);
        assert_eq!(d.step_data["signatures"].signatories("signatories").len(), 3);
    }

    #[test]
    fn normalize_rebuilds_truncated_checklist_and_signatories() {
        let reg = builtin_registry(PermitKind::Ht).unwrap();
        let mut d = PermitDraft::new(&reg, "HT-1");
        {
            let iso = Arc::make_mut(d.step_data.get_mut("isolation").unwrap());
            let Some(FieldValue::Checklist(rows)) = iso.fields.get_mut("checklist") else {
                panic!("seeded checklist");
            };
            for r in rows.iter_mut() {
                r.answer = Answer::Yes;
            }
            rows[3].remarks = "tagged".into();
            rows.remove(6);
            rows.reverse();

            let sig = Arc::make_mut(d.step_data.get_mut("signatures").unwrap());
            let Some(FieldValue::Signatories(blocks)) = sig.fields.get_mut("signatories") else {
                panic!("seeded signatories");
            };
            blocks[0].name = "A. Rao".into();
            blocks.push(SignatoryBlock::for_role("Stranger"));
            blocks.swap(0, 1);
        }

        d.normalize(&reg);

        let rows = d.step_data["isolation"].checklist("checklist");
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().enumerate().all(|(i, r)| r.id == (i + 1) as u32));
        assert_eq!(rows[6].answer, Answer::Empty);
        assert_eq!(rows[3].remarks, "tagged");
        assert_eq!(rows.iter().filter(|r| r.answer == Answer::Yes).count(), 11);

        let seeded = PermitDraft::new(&reg, "HT-1");
        let want: Vec<&str> = seeded.step_data["signatures"]
            .signatories("signatories")
            .iter()
            .map(|b| b.role.as_str())
            .collect();
        let blocks = d.step_data["signatures"].signatories("signatories");
        let got: Vec<&str> = blocks.iter().map(|b| b.role.as_str()).collect();
        assert_eq!(got, want);
        assert_eq!(blocks[0].name, "A. Rao");
    }

    #[test]
    fn normalize_leaves_matching_steps_shared() {
        let reg = builtin_registry(PermitKind::Gas).unwrap();
        let mut d = PermitDraft::new(&reg, "GAS-1");
        let before = d.step_data["checklist"].clone();
        d.normalize(&reg);
        assert!(Arc::ptr_eq(&before, &d.step_data["checklist"]));
    }

    #[test]
    fn permit_id_rules() {
        assert!(validate_permit_id("HT-001").is_ok());
        assert!(validate_permit_id("").is_err());
        assert!(validate_permit_id("../etc").is_err());
        assert!(validate_permit_id(&"x".repeat(65)).is_err());

        let id = generate_permit_id("gas");
        assert!(id.starts_with("GAS-"));
        assert!(validate_permit_id(&id).is_ok());
    }
}
