//! Marker error types.
//!
//! Errors that can occur while parsing grader reports or feedback payloads.
//! Note that a *failing grade* is not an error: a grader process failure is
//! folded into a valid-shaped failing [`crate::FeedbackRecord`] so the
//! session always has something to show for review.

use std::fmt;

/// Represents all error types that can occur in the marker crate.
#[derive(Debug)]
pub enum MarkerError {
    /// JSON is malformed or does not match the grader report schema.
    InvalidJson(String),
    /// A required field is missing from input.
    MissingField(String),
}

impl fmt::Display for MarkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerError::InvalidJson(msg) => write!(f, "invalid grader report JSON: {msg}"),
            MarkerError::MissingField(field) => write!(f, "missing field: {field}"),
        }
    }
}

impl std::error::Error for MarkerError {}
