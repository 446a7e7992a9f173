// src/template/registry.rs

use std::collections::BTreeMap;
use std::path::Path;

use crate::template::permit_steps::{
    load_template_path, parse_template_str, RegistryTemplate, StepDef, StepTemplate,
    TemplateLoadError,
};
use crate::types::Role;

/// Ordered, immutable list of steps for one permit type.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    template: RegistryTemplate,
    index_by_id: BTreeMap<String, usize>,
}

impl StepRegistry {
    pub fn from_template(mut template: RegistryTemplate) -> Self {
        template.compile_patterns();
        let index_by_id = template
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        Self {
            template,
            index_by_id,
        }
    }

    pub fn from_json5(s: &str) -> Result<Self, TemplateLoadError> {
        Ok(Self::from_template(parse_template_str(s)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TemplateLoadError> {
        Ok(Self::from_template(load_template_path(path)?))
    }

    pub fn template_id(&self) -> &str {
        &self.template.template_id
    }

    pub fn title(&self) -> &str {
        &self.template.title
    }

    pub fn storage_prefix(&self) -> &str {
        &self.template.storage_prefix
    }

    pub fn len(&self) -> usize {
        self.template.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepTemplate] {
        &self.template.steps
    }

    pub fn step_defs(&self) -> Vec<StepDef> {
        self.template.steps.iter().map(StepTemplate::def).collect()
    }

    pub fn step(&self, index: usize) -> Option<&StepTemplate> {
        self.template.steps.get(index)
    }

    pub fn step_by_id(&self, id: &str) -> Option<&StepTemplate> {
        self.index_of(id).and_then(|i| self.step(i))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.template.steps.get(index).map(|s| s.id.as_str())
    }

    pub fn last_index(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Step a restricted role is pinned to, if any.
    pub fn restricted_step_for(&self, role: Role) -> Option<&str> {
        self.template
            .role_steps
            .iter()
            .find(|(name, _)| Role::parse(name) == Some(role))
            .map(|(_, step)| step.as_str())
    }
}
