//! Validation error types

use std::fmt;

/// Validation error for requests rejected before they reach the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// String doesn't match required format (e.g., identifier)
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Filter name shadows one of the paging/ordering parameters
    ReservedName { name: String },

    /// Same filter name supplied twice
    DuplicateName { name: String },

    /// Number below its lower bound
    OutOfRange { field: &'static str, min: i64, value: i64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::ReservedName { name } => {
                write!(f, "filter '{}' collides with a reserved parameter name", name)
            }
            Self::DuplicateName { name } => write!(f, "filter '{}' supplied more than once", name),
            Self::OutOfRange { field, min, value } => {
                write!(f, "{} must be at least {} (got {})", field, min, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}
