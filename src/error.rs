// src/error.rs

use std::fmt;

use crate::command::WizardError;
use crate::persistence::StorageError;
use crate::review::ReviewError;
use crate::template::TemplateLoadError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserMsgKind {
    Success,
    Warn,
    Error,
    Info,
}

#[derive(Clone, Debug)]
pub struct UserMsg {
    pub kind: UserMsgKind,
    pub short: &'static str,
    pub detail: Option<String>,
}

#[derive(Debug)]
pub enum AppError {
    // --------------------------------------------------
    // generic / plumbing
    // --------------------------------------------------
    Io(std::io::Error),
    Msg(String),
    StateLockPoisoned,
    DataDirUnavailable,

    // --------------------------------------------------
    // configuration / input
    // --------------------------------------------------
    InvalidConfig(String),
    UnknownRole(String),
    UnknownPermitType(String),
    InvalidPermitId(String),
    DraftNotFound(String),

    // --------------------------------------------------
    // wrapped module errors
    // --------------------------------------------------
    Template(TemplateLoadError),
    Wizard(WizardError),
    Storage(StorageError),
    Review(ReviewError),
}

impl AppError {
    pub fn user_msg(&self) -> UserMsg {
        use AppError::*;

        let mut kind = UserMsgKind::Error;
        let detail = Some(self.to_string());

        let short: &'static str = match self {
            Io(_) => "File operation failed.",
            Msg(_) => "Operation failed.",
            StateLockPoisoned => "Internal state lock failed.",
            DataDirUnavailable => "No data directory available.",

            InvalidConfig(_) => "Invalid configuration.",
            UnknownRole(_) => "Unknown role.",
            UnknownPermitType(_) => "Unknown permit type.",
            InvalidPermitId(_) => "Invalid permit number.",
            DraftNotFound(_) => {
                kind = UserMsgKind::Warn;
                "No saved draft for that permit."
            }

            Template(_) => "Permit template is invalid.",
            Wizard(WizardError::AlreadySubmitted) => {
                kind = UserMsgKind::Info;
                "Permit was already submitted."
            }
            Wizard(WizardError::StepNotEditable { .. }) => {
                kind = UserMsgKind::Warn;
                "That step is read-only for your role."
            }
            Wizard(_) => "Wizard operation failed.",
            Storage(StorageError::QuotaExceeded { .. }) => "Draft storage is full.",
            Storage(_) => "Draft storage failed.",
            Review(_) => "Permit register rejected the request.",
        };

        UserMsg {
            kind,
            short,
            detail,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AppError::*;

        match self {
            Io(e) => write!(f, "io error: {e}"),
            Msg(s) => write!(f, "{s}"),
            StateLockPoisoned => write!(f, "state lock poisoned"),
            DataDirUnavailable => write!(f, "could not determine a data directory"),

            InvalidConfig(s) => write!(f, "invalid configuration: {s}"),
            UnknownRole(s) => write!(f, "unknown role '{s}'"),
            UnknownPermitType(s) => write!(f, "{s}"),
            InvalidPermitId(s) => write!(f, "{s}"),
            DraftNotFound(id) => write!(f, "no saved draft for permit '{id}'"),

            Template(e) => write!(f, "template: {e}"),
            Wizard(e) => write!(f, "{e}"),
            Storage(e) => write!(f, "storage: {e}"),
            Review(e) => write!(f, "register: {e}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<TemplateLoadError> for AppError {
    fn from(e: TemplateLoadError) -> Self {
        AppError::Template(e)
    }
}

impl From<WizardError> for AppError {
    fn from(e: WizardError) -> Self {
        AppError::Wizard(e)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Storage(e)
    }
}

impl From<ReviewError> for AppError {
    fn from(e: ReviewError) -> Self {
        AppError::Review(e)
    }
}
