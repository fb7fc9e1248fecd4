use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningErrorKind {
    /// Raised while building a pipeline; the pipeline never becomes usable.
    Configuration,
    /// Raised while processing an event; that event's output is not committed.
    InputMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CleaningError {
    pub kind: CleaningErrorKind,
    pub message: String,
}

impl CleaningError {
    pub fn new(kind: CleaningErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind == CleaningErrorKind::Configuration
    }

    pub fn is_input_missing(&self) -> bool {
        self.kind == CleaningErrorKind::InputMissing
    }
}

pub fn configuration_error(message: impl Into<String>) -> CleaningError {
    CleaningError::new(CleaningErrorKind::Configuration, message)
}

pub fn input_missing(message: impl Into<String>) -> CleaningError {
    CleaningError::new(CleaningErrorKind::InputMissing, message)
}
