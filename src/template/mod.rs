// src/template/mod.rs

pub mod builtin;
pub mod permit_steps;
pub mod registry;

pub use builtin::{builtin_registry, PermitKind};
pub use permit_steps::{
    load_template_path, parse_template_str, FieldSpec, FieldType, RegistryTemplate, StepDef,
    StepTemplate, TemplateLoadError,
};
pub use registry::StepRegistry;
