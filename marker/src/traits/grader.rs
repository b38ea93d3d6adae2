//! The seam between the review loop and the external grader.

use std::path::Path;

/// What one grading run produced: a human-readable transcript and the
/// reached point total.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub transcript: String,
    pub points: f64,
}

impl GradeOutcome {
    /// Outcome for a grader run that did not produce a usable report: zero
    /// points, with the failure text as the transcript. Grading always
    /// yields *something* reviewable; it never aborts the session.
    pub fn failure(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            points: 0.0,
        }
    }
}

/// A pluggable grading backend.
///
/// Implementations are blocking: the call returns once the external grading
/// process has exited and its result has been reduced to a [`GradeOutcome`].
/// Process failures must be folded into a failing outcome, not an error.
pub trait Grader {
    fn grade(&mut self, submission: &Path) -> GradeOutcome;
}
