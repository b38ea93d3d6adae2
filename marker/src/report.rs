//! Grader report parsing.
//!
//! The containerized grader writes a JSON result per submission:
//!
//! ```json
//! {
//!   "total": { "reached": 8.5, "max": 10 },
//!   "tests": {
//!     "test_foo": {
//!       "points": { "public": 2, "private": 1.5 },
//!       "public": { "comment": "ok" },
//!       "private": { "comment": "" }
//!     }
//!   }
//! }
//! ```
//!
//! The report is reduced to a human-readable transcript plus the reached
//! point total; the per-case structure is not kept beyond that.

use crate::error::MarkerError;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct GradeReport {
    pub total: TotalPoints,
    /// Test cases by name. A `BTreeMap` keeps the transcript deterministic
    /// (name order) regardless of the JSON object order.
    #[serde(default)]
    pub tests: BTreeMap<String, TestCase>,
}

#[derive(Debug, Deserialize)]
pub struct TotalPoints {
    pub reached: f64,
    pub max: f64,
}

#[derive(Debug, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub points: TestPoints,
    pub public: Option<CaseDetail>,
    pub private: Option<CaseDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestPoints {
    pub public: Option<f64>,
    pub private: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CaseDetail {
    #[serde(default)]
    pub comment: String,
}

impl GradeReport {
    pub fn from_json(raw: &str) -> Result<Self, MarkerError> {
        serde_json::from_str(raw).map_err(|e| MarkerError::InvalidJson(e.to_string()))
    }

    pub fn reached(&self) -> f64 {
        self.total.reached
    }

    /// Human-readable transcript: the point total followed by one line per
    /// test case and visibility, with the grader's comment when present.
    pub fn transcript(&self) -> String {
        let mut text = format!(
            "Total Points: {} out of {}\n",
            self.total.reached, self.total.max
        );

        for (name, case) in &self.tests {
            let visibilities = [
                ("public", case.points.public, case.public.as_ref()),
                ("private", case.points.private, case.private.as_ref()),
            ];
            for (visibility, points, detail) in visibilities {
                let Some(points) = points else { continue };
                text.push_str(&format!("[{name}] {visibility} test: {points} points"));
                if let Some(detail) = detail {
                    if !detail.comment.is_empty() {
                        text.push_str(&format!("; comment: {}", detail.comment));
                    }
                }
                text.push('\n');
            }
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "total": { "reached": 8.5, "max": 10 },
        "tests": {
            "test_vector": {
                "points": { "public": 2, "private": 1.5 },
                "public": { "comment": "all assertions hold" },
                "private": { "comment": "" }
            },
            "test_matrix": {
                "points": { "public": 5 },
                "public": { "comment": "" }
            }
        }
    }"#;

    #[test]
    fn parses_and_reduces_to_a_transcript() {
        let report = GradeReport::from_json(RAW).unwrap();
        assert_eq!(report.reached(), 8.5);

        let transcript = report.transcript();
        assert!(transcript.starts_with("Total Points: 8.5 out of 10\n"));
        // BTreeMap: test_matrix sorts before test_vector
        let matrix = transcript.find("[test_matrix] public test: 5 points").unwrap();
        let vector = transcript
            .find("[test_vector] public test: 2 points; comment: all assertions hold")
            .unwrap();
        assert!(matrix < vector);
        assert!(transcript.contains("[test_vector] private test: 1.5 points\n"));
    }

    #[test]
    fn empty_comments_are_omitted() {
        let report = GradeReport::from_json(RAW).unwrap();
        let transcript = report.transcript();
        assert!(!transcript.contains("test: 5 points; comment"));
    }

    #[test]
    fn missing_tests_object_still_parses() {
        let report =
            GradeReport::from_json(r#"{ "total": { "reached": 0, "max": 10 } }"#).unwrap();
        assert_eq!(report.transcript(), "Total Points: 0 out of 10\n");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            GradeReport::from_json("{ nope"),
            Err(MarkerError::InvalidJson(_))
        ));
    }
}
