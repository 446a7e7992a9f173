// src/template/builtin.rs

use std::fmt;
use std::str::FromStr;

use crate::template::permit_steps::TemplateLoadError;
use crate::template::registry::StepRegistry;

const GENERAL_TEMPLATE: &str = include_str!("../../templates/general.json5");
const HT_TEMPLATE: &str = include_str!("../../templates/ht.json5");
const GAS_TEMPLATE: &str = include_str!("../../templates/gas.json5");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermitKind {
    General,
    Ht,
    Gas,
}

impl PermitKind {
    pub const ALL: [PermitKind; 3] = [PermitKind::General, PermitKind::Ht, PermitKind::Gas];

    pub fn as_str(self) -> &'static str {
        match self {
            PermitKind::General => "general",
            PermitKind::Ht => "ht",
            PermitKind::Gas => "gas",
        }
    }

    fn source(self) -> &'static str {
        match self {
            PermitKind::General => GENERAL_TEMPLATE,
            PermitKind::Ht => HT_TEMPLATE,
            PermitKind::Gas => GAS_TEMPLATE,
        }
    }
}

impl fmt::Display for PermitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "gwp" => Ok(PermitKind::General),
            "ht" | "electrical" => Ok(PermitKind::Ht),
            "gas" => Ok(PermitKind::Gas),
            other => Err(format!("unknown permit type '{other}' (general|ht|gas)")),
        }
    }
}

pub fn builtin_registry(kind: PermitKind) -> Result<StepRegistry, TemplateLoadError> {
    StepRegistry::from_json5(kind.source())
}
