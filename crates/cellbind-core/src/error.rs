#![forbid(unsafe_code)]

//! Error taxonomy for path resolution and computed-property evaluation.
//!
//! Only three things can fail, and all of them fail synchronously before
//! any registry or store mutation: resolving a path whose intermediate
//! segment is missing, resolving a malformed path, and re-entering the
//! evaluation of a computed name that is already being evaluated.
//! Malformed *registrations* (empty name, empty dependency list) and
//! teardown of unknown names are deliberate silent no-ops, not errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// An intermediate path segment does not name an existing object field.
    #[error("path segment not found: {segment}")]
    PathNotFound { segment: String },

    /// The path is empty or contains an empty segment.
    #[error("invalid path: {path:?}")]
    InvalidPath { path: String },

    /// A derivation re-entered the evaluation of its own computed name.
    #[error("cycle detected while evaluating computed property: {name}")]
    CycleDetected { name: String },
}

impl BindError {
    #[must_use]
    pub fn not_found(segment: impl Into<String>) -> Self {
        Self::PathNotFound {
            segment: segment.into(),
        }
    }

    #[must_use]
    pub fn invalid(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_segment() {
        let err = BindError::not_found("b");
        assert_eq!(err.to_string(), "path segment not found: b");
    }

    #[test]
    fn display_quotes_the_invalid_path() {
        let err = BindError::invalid("a..b");
        assert_eq!(err.to_string(), "invalid path: \"a..b\"");
    }
}
