//! Domain error types.

use thiserror::Error;

/// A field-level input validation failure.
///
/// Surfaced to HTTP callers as a 400 with the offending field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Name of the rejected input field.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: &'static str,
}

impl ValidationError {
    /// Creates a new validation error for a field.
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}
