// src/template/permit_steps.rs

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::types::Role;

/// Top-level JSON5 template describing one permit type's wizard.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryTemplate {
    pub template_id: String,
    pub title: String,

    /// Storage key prefix; drafts live under `<storage_prefix>-<permitId>`.
    pub storage_prefix: String,

    /// role name -> step id the role is pinned to.
    #[serde(default)]
    pub role_steps: BTreeMap<String, String>,

    pub steps: Vec<StepTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
    pub id: String,
    pub name: String,
    pub desc: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,

    /// text/date/time rules: min_len:N, max_len:N, regex:PAT, number, not_before:KEY
    pub validators: Option<Vec<String>>,

    /// For checklist fields: the fixed activity list rows are seeded from.
    pub activities: Option<Vec<String>>,

    /// For signatory fields: one block per role.
    pub roles: Option<Vec<String>>,

    #[serde(skip)]
    patterns: Vec<regex::Regex>,
}

impl FieldSpec {
    /// The compiled form of a `regex:` validator, once the owning registry is built.
    pub fn pattern(&self, pat: &str) -> Option<&regex::Regex> {
        self.patterns.iter().find(|re| re.as_str() == pat)
    }

    fn compile_patterns(&mut self) {
        let compiled = self
            .validators
            .iter()
            .flatten()
            .filter_map(|rule| rule.strip_prefix("regex:"))
            .filter_map(|pat| regex::Regex::new(pat).ok())
            .collect();
        self.patterns = compiled;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Date,
    Time,
    Bool,
    Confirm,
    Checklist,
    Signatories,
    Comments,
}

impl FieldType {
    pub fn is_scalar_text(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Date | FieldType::Time)
    }

    pub fn is_flag(self) -> bool {
        matches!(self, FieldType::Bool | FieldType::Confirm)
    }
}

impl StepTemplate {
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn def(&self) -> StepDef {
        StepDef {
            id: self.id.clone(),
            name: self.name.clone(),
            desc: self.desc.clone(),
        }
    }
}

#[derive(Debug)]
pub enum TemplateLoadError {
    Io(std::io::Error),
    Parse(json5::Error),
    Validation(String),
}

impl std::fmt::Display for TemplateLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateLoadError::Io(e) => write!(f, "I/O error: {e}"),
            TemplateLoadError::Parse(e) => write!(f, "Template parse error: {e}"),
            TemplateLoadError::Validation(msg) => write!(f, "Template validation error: {msg}"),
        }
    }
}

impl std::error::Error for TemplateLoadError {}

impl From<std::io::Error> for TemplateLoadError {
    fn from(e: std::io::Error) -> Self {
        TemplateLoadError::Io(e)
    }
}

impl From<json5::Error> for TemplateLoadError {
    fn from(e: json5::Error) -> Self {
        TemplateLoadError::Parse(e)
    }
}

impl RegistryTemplate {
    /// Compiles every `regex:` validator so text checks reuse them.
    pub(crate) fn compile_patterns(&mut self) {
        for step in self.steps.iter_mut() {
            for spec in step.fields.iter_mut() {
                spec.compile_patterns();
            }
        }
    }
}

/// Parse a JSON5 template string.
pub fn parse_template_str(s: &str) -> Result<RegistryTemplate, TemplateLoadError> {
    let tpl: RegistryTemplate = json5::from_str(s)?;
    validate_template(&tpl)?;
    Ok(tpl)
}

/// Load a JSON5 template from disk (e.g. a form-builder export).
pub fn load_template_path(path: impl AsRef<Path>) -> Result<RegistryTemplate, TemplateLoadError> {
    let s = fs::read_to_string(path)?;
    parse_template_str(&s)
}

/// Structural validation; field values are checked later by the step validator.
pub fn validate_template(tpl: &RegistryTemplate) -> Result<(), TemplateLoadError> {
    if tpl.template_id.trim().is_empty() {
        return Err(TemplateLoadError::Validation(
            "template_id must be non-empty".to_string(),
        ));
    }
    if !is_storage_safe(&tpl.storage_prefix) {
        return Err(TemplateLoadError::Validation(format!(
            "storage_prefix '{}' must be non-empty [A-Za-z0-9_-]",
            tpl.storage_prefix
        )));
    }
    if tpl.steps.is_empty() {
        return Err(TemplateLoadError::Validation(
            "template must contain at least one step".to_string(),
        ));
    }

    let mut step_ids = BTreeSet::new();
    for (i, s) in tpl.steps.iter().enumerate() {
        if !is_path_segment(&s.id) {
            return Err(TemplateLoadError::Validation(format!(
                "steps[{i}].id '{}' must be non-empty [A-Za-z0-9_]",
                s.id
            )));
        }
        if !step_ids.insert(s.id.as_str()) {
            return Err(TemplateLoadError::Validation(format!(
                "steps[{i}].id must be unique; duplicate found for '{}'",
                s.id
            )));
        }
        if s.name.trim().is_empty() {
            return Err(TemplateLoadError::Validation(format!(
                "steps[{i}].name must be non-empty"
            )));
        }

        let mut keys = BTreeSet::new();
        for (j, fs) in s.fields.iter().enumerate() {
            if !is_path_segment(&fs.key) {
                return Err(TemplateLoadError::Validation(format!(
                    "steps[{i}].fields[{j}].key '{}' must be non-empty [A-Za-z0-9_]",
                    fs.key
                )));
            }
            if !keys.insert(fs.key.as_str()) {
                return Err(TemplateLoadError::Validation(format!(
                    "steps[{i}] declares duplicate field key '{}'",
                    fs.key
                )));
            }
            if fs.label.trim().is_empty() {
                return Err(TemplateLoadError::Validation(format!(
                    "steps[{i}].fields[{j}].label must be non-empty"
                )));
            }

            match fs.field_type {
                FieldType::Checklist => {
                    let ok = fs.activities.as_ref().map(|a| !a.is_empty()).unwrap_or(false);
                    if !ok {
                        return Err(TemplateLoadError::Validation(format!(
                            "steps[{i}].fields[{j}] type=checklist requires activities"
                        )));
                    }
                }
                FieldType::Signatories => {
                    let ok = fs.roles.as_ref().map(|r| !r.is_empty()).unwrap_or(false);
                    if !ok {
                        return Err(TemplateLoadError::Validation(format!(
                            "steps[{i}].fields[{j}] type=signatories requires roles"
                        )));
                    }
                }
                _ => {}
            }

            if let Some(vs) = &fs.validators {
                if !fs.field_type.is_scalar_text() {
                    return Err(TemplateLoadError::Validation(format!(
                        "steps[{i}].fields[{j}] validators are only allowed on text/date/time"
                    )));
                }
                for rule in vs {
                    if let Some(pat) = rule.strip_prefix("regex:") {
                        if let Err(e) = regex::Regex::new(pat) {
                            return Err(TemplateLoadError::Validation(format!(
                                "steps[{i}].fields[{j}] regex '{pat}' does not compile: {e}"
                            )));
                        }
                    } else if let Some(n) = rule
                        .strip_prefix("min_len:")
                        .or_else(|| rule.strip_prefix("max_len:"))
                    {
                        if n.parse::<usize>().is_err() {
                            return Err(TemplateLoadError::Validation(format!(
                                "steps[{i}].fields[{j}] rule '{rule}' needs a length"
                            )));
                        }
                    } else if let Some(other) = rule.strip_prefix("not_before:") {
                        if fs.field_type != FieldType::Date {
                            return Err(TemplateLoadError::Validation(format!(
                                "steps[{i}].fields[{j}] not_before is only allowed on dates"
                            )));
                        }
                        if !s.fields.iter().any(|f| f.key == other) {
                            return Err(TemplateLoadError::Validation(format!(
                                "steps[{i}].fields[{j}] not_before references unknown field '{other}'"
                            )));
                        }
                    }
                }
            }
        }
    }

    for (role, step_id) in tpl.role_steps.iter() {
        if Role::parse(role).is_none() {
            return Err(TemplateLoadError::Validation(format!(
                "role_steps names unknown role '{role}'"
            )));
        }
        if !step_ids.contains(step_id.as_str()) {
            return Err(TemplateLoadError::Validation(format!(
                "role_steps pins '{role}' to unknown step '{step_id}'"
            )));
        }
    }

    Ok(())
}

/// Step ids and field keys double as path segments.
pub(crate) fn is_path_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_'))
        && !s.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn is_storage_safe(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-'))
}
