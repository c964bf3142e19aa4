use super::{Package, Stack};
use std::fmt;
use thiserror::Error;

/// Field of a log event that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Stack,
    Level,
    Package,
    Message,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Stack => "stack",
            Field::Level => "level",
            Field::Package => "package",
            Field::Message => "message",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of a log event before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid {field}. Allowed (lowercase): {allowed}")]
    NotInSet { field: Field, allowed: String },

    #[error("Message must be a string")]
    MessageNotString,

    #[error("Package '{package}' is not used on the {stack} stack")]
    ScopeMismatch { stack: Stack, package: Package },
}

impl ValidationError {
    /// The field the caller has to fix.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::NotInSet { field, .. } => *field,
            ValidationError::MessageNotString => Field::Message,
            ValidationError::ScopeMismatch { .. } => Field::Package,
        }
    }
}
