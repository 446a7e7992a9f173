// src/context.rs

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::persistence::{AutosavePolicy, DEFAULT_DEBOUNCE, DEFAULT_MAX_LATENCY};
use crate::types::Role;

pub const APP_QUALIFIER: &str = "org";
pub const APP_ORG: &str = "permitflow";
pub const APP_ID: &str = "permitflow";

pub const DRAFTS_DIR: &str = "drafts";
pub const REGISTER_DIR: &str = "register";
pub const TEMPLATES_DIR: &str = "templates";

pub const ENV_DATA_DIR: &str = "PERMITFLOW_DATA_DIR";
pub const ENV_DEBUG: &str = "PERMITFLOW_DEBUG";
pub const ENV_ROLE: &str = "PERMITFLOW_ROLE";
pub const ENV_DEBOUNCE_MS: &str = "PERMITFLOW_AUTOSAVE_DEBOUNCE_MS";
pub const ENV_MAX_LATENCY_SECS: &str = "PERMITFLOW_AUTOSAVE_MAX_LATENCY_SECS";

#[derive(Debug, Clone)]
pub struct AppCtx {
    pub app_data_dir: PathBuf,
    pub debug: bool,
}

impl AppCtx {
    pub fn new(app_data_dir: PathBuf) -> Self {
        let debug = std::env::var(ENV_DEBUG)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            app_data_dir,
            debug,
        }
    }

    /// <app_data>/drafts
    pub fn drafts_dir(&self) -> PathBuf {
        self.app_data_dir.join(DRAFTS_DIR)
    }

    /// <app_data>/register
    pub fn register_dir(&self) -> PathBuf {
        self.app_data_dir.join(REGISTER_DIR)
    }

    /// <app_data>/templates; custom `<id>.json5` registries are looked up here.
    pub fn templates_dir(&self) -> PathBuf {
        self.app_data_dir.join(TEMPLATES_DIR)
    }
}

/// Explicit override, then `PERMITFLOW_DATA_DIR`, then a dev sandbox in debug builds,
/// then the platform data dir.
pub fn resolve_app_data_dir(explicit: Option<PathBuf>) -> AppResult<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_DATA_DIR) {
        if !p.trim().is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    if cfg!(debug_assertions) {
        // dev-only sandbox
        if let Ok(home) = std::env::var("HOME") {
            return Ok(PathBuf::from(home).join(".local/share/permitflow-dev"));
        }
    }
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_ID)
        .map(|p| p.data_dir().to_path_buf())
        .ok_or(AppError::DataDirUnavailable)
}

/// Session settings that come from the environment; CLI flags override them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WizardConfig {
    pub role: Role,
    pub autosave: AutosavePolicy,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            role: Role::Requester,
            autosave: AutosavePolicy::default(),
        }
    }
}

impl WizardConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();

        if let Some(r) = get(ENV_ROLE).filter(|s| !s.trim().is_empty()) {
            cfg.role = Role::parse(&r).ok_or(AppError::UnknownRole(r))?;
        }

        let debounce_ms = parse_env_u64(&get, ENV_DEBOUNCE_MS)?
            .unwrap_or(DEFAULT_DEBOUNCE.as_millis() as u64);
        let max_latency_s =
            parse_env_u64(&get, ENV_MAX_LATENCY_SECS)?.unwrap_or(DEFAULT_MAX_LATENCY.as_secs());

        cfg.autosave = AutosavePolicy {
            debounce: Duration::from_millis(debounce_ms),
            max_latency: Duration::from_secs(max_latency_s),
        };
        if cfg.autosave.max_latency < cfg.autosave.debounce {
            return Err(AppError::InvalidConfig(format!(
                "{ENV_MAX_LATENCY_SECS} must not be shorter than {ENV_DEBOUNCE_MS}"
            )));
        }

        Ok(cfg)
    }
}

fn parse_env_u64(get: &impl Fn(&str) -> Option<String>, key: &str) -> AppResult<Option<u64>> {
    match get(key) {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| AppError::InvalidConfig(format!("{key}='{v}' is not a whole number"))),
    }
}

// ======================================================
// Unit Tests
// ======================================================
