// src/draft/path.rs

//! Dot-delimited pointers into `stepData`.
//!
//! Only two shapes exist: `<step>.<field>` and `<step>.<field>.<index>.<column>`, each
//! optionally prefixed with `stepData.`. Column names are checked against the field type by
//! the store, not here.

use std::fmt;
use std::str::FromStr;

use crate::template::permit_steps::is_path_segment;

pub const STEP_DATA_PREFIX: &str = "stepData.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Field {
        step: String,
        field: String,
    },
    Item {
        step: String,
        field: String,
        index: usize,
        column: String,
    },
}

impl FieldPath {
    pub fn field(step: &str, field: &str) -> Self {
        FieldPath::Field {
            step: step.to_string(),
            field: field.to_string(),
        }
    }

    pub fn item(step: &str, field: &str, index: usize, column: &str) -> Self {
        FieldPath::Item {
            step: step.to_string(),
            field: field.to_string(),
            index,
            column: column.to_string(),
        }
    }

    pub fn step(&self) -> &str {
        match self {
            FieldPath::Field { step, .. } | FieldPath::Item { step, .. } => step,
        }
    }

    pub fn field_key(&self) -> &str {
        match self {
            FieldPath::Field { field, .. } | FieldPath::Item { field, .. } => field,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Field { step, field } => write!(f, "{STEP_DATA_PREFIX}{step}.{field}"),
            FieldPath::Item {
                step,
                field,
                index,
                column,
            } => write!(f, "{STEP_DATA_PREFIX}{step}.{field}.{index}.{column}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub path: String,
    pub reason: String,
}

impl PathError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path '{}': {}", self.path, self.reason)
    }
}

impl std::error::Error for PathError {}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        let s = s.strip_prefix(STEP_DATA_PREFIX).unwrap_or(s);
        let parts: Vec<&str> = s.split('.').collect();

        match parts.as_slice() {
            [step, field] => {
                check_segment(raw, step)?;
                check_segment(raw, field)?;
                Ok(FieldPath::field(step, field))
            }
            [step, field, index, column] => {
                check_segment(raw, step)?;
                check_segment(raw, field)?;
                let index = index.parse::<usize>().map_err(|_| {
                    PathError::new(raw, format!("'{index}' is not an array index"))
                })?;
                check_segment(raw, column)?;
                Ok(FieldPath::item(step, field, index, column))
            }
            _ => Err(PathError::new(
                raw,
                "expected <step>.<field> or <step>.<field>.<index>.<column>",
            )),
        }
    }
}

fn check_segment(raw: &str, seg: &str) -> Result<(), PathError> {
    if is_path_segment(seg) {
        Ok(())
    } else {
        Err(PathError::new(raw, format!("bad segment '{seg}'")))
    }
}
