use std::fmt;

/// Failures surfaced by the controller core.
///
/// Refused toggles are not represented here: they come back as a plain
/// `false` from the toggle API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    Load { dataset: String, reason: String },
    InvalidMode(String),
    InvalidIntensity(String),
    InvalidSafetyLevel(String),
    UnknownNeed(String),
    CorruptSnapshot(String),
    Persist(String),
    Catalog(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Load { dataset, reason } => {
                write!(f, "failed to load dataset '{dataset}': {reason}")
            }
            CoreError::InvalidMode(v) => write!(f, "invalid mode: {v}"),
            CoreError::InvalidIntensity(v) => write!(f, "invalid intensity level: {v}"),
            CoreError::InvalidSafetyLevel(v) => write!(f, "invalid safety level: {v}"),
            CoreError::UnknownNeed(v) => write!(f, "unknown healing need: {v}"),
            CoreError::CorruptSnapshot(msg) => write!(f, "corrupt settings snapshot: {msg}"),
            CoreError::Persist(msg) => write!(f, "settings store error: {msg}"),
            CoreError::Catalog(msg) => write!(f, "invalid catalog: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
