// src/types.rs

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::save_log::SaveLog;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Requester,
    Approver,
    SafetyOfficer,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "requester" | "user" => Some(Role::Requester),
            "approver" => Some(Role::Approver),
            "safety_officer" | "safety" => Some(Role::SafetyOfficer),
            "admin" | "administrator" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Requester => "requester",
            Role::Approver => "approver",
            Role::SafetyOfficer => "safety_officer",
            Role::Admin => "admin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Requester => "Requester",
            Role::Approver => "Approver",
            Role::SafetyOfficer => "Safety Officer",
            Role::Admin => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only to the wizard core; the surrounding application sets it.
pub struct SessionState {
    pub role: Role,
}

pub struct AppState {
    pub session: Mutex<SessionState>,

    // persistent + in-memory log of swallowed save failures
    pub save_log: Mutex<SaveLog>,
}

impl AppState {
    /// State with a memory-only save log; nothing touches disk.
    pub fn in_memory() -> Self {
        Self::with_save_log(Role::Requester, SaveLog::in_memory())
    }

    pub fn with_save_log(role: Role, save_log: SaveLog) -> Self {
        Self {
            session: Mutex::new(SessionState { role }),
            save_log: Mutex::new(save_log),
        }
    }

    pub fn role(&self) -> Role {
        self.session
            .lock()
            .map(|s| s.role)
            .unwrap_or(Role::Requester)
    }
}
