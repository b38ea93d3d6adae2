//! The grading outcome of one group, with its two serializations.
//!
//! A [`FeedbackRecord`] holds the points, the automated test output and the
//! grader's free-text feedback. It is stored in the gradebook comment field
//! as an HTML payload (payload segments wrapped in a magic delimiter so they
//! can be recovered later) and edited by the grader through a structured
//! plain-text form with divider-delimited sections.

use regex::Regex;

/// Wrap each non-empty line in `<p>…</p>` for gradebook storage.
pub fn encode_comment<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|s| s.as_ref())
        .filter(|s| !s.is_empty())
        .map(|s| format!("<p>{s}</p>"))
        .collect()
}

/// Split paragraph-encoded HTML back into lines, dropping empty segments.
pub fn decode_comment(html: &str) -> Vec<String> {
    let splitter = Regex::new(r"</?p>").expect("static regex");
    splitter
        .split(html)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// The literal tokens used as parse boundaries in the two serializations.
#[derive(Debug, Clone)]
pub struct FeedbackFormat {
    /// Magic delimiter wrapping payload segments in the HTML form.
    pub magic: String,
    /// Divider token separating sections in the editable text form.
    pub divider: String,
}

impl Default for FeedbackFormat {
    fn default() -> Self {
        Self {
            magic: "<!--%%%-->".to_string(),
            divider: "%".to_string(),
        }
    }
}

/// One group's grading outcome.
///
/// Mutated only through the explicit setters (or [`FeedbackRecord::replace_with`]);
/// nothing else touches the fields partially.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedbackRecord {
    points: Option<f64>,
    test_output: String,
    additional_feedback: String,
}

impl FeedbackRecord {
    pub fn new(points: Option<f64>, test_output: &str, additional_feedback: &str) -> Self {
        Self {
            points,
            test_output: test_output.trim().to_string(),
            additional_feedback: additional_feedback.trim().to_string(),
        }
    }

    pub fn points(&self) -> Option<f64> {
        self.points
    }

    pub fn test_output(&self) -> &str {
        &self.test_output
    }

    pub fn additional_feedback(&self) -> &str {
        &self.additional_feedback
    }

    pub fn set_points(&mut self, points: Option<f64>) {
        self.points = points;
    }

    pub fn set_test_output(&mut self, test_output: &str) {
        self.test_output = test_output.trim().to_string();
    }

    pub fn set_additional_feedback(&mut self, feedback: &str) {
        self.additional_feedback = feedback.trim().to_string();
    }

    pub fn replace_with(&mut self, other: FeedbackRecord) {
        *self = other;
    }

    /// A record may reach the gradebook only when this holds: points are a
    /// real non-negative number (zero is fine) and the test output is
    /// non-empty.
    pub fn is_valid(&self) -> bool {
        match self.points {
            Some(p) => p.is_finite() && p >= 0.0 && !self.test_output.is_empty(),
            None => false,
        }
    }

    /// Render the HTML payload stored in the gradebook comment field.
    ///
    /// The magic delimiter appears 4 times, wrapping 2 payload segments:
    /// the raw test output and the paragraph-encoded additional feedback.
    pub fn to_html(&self, fmt: &FeedbackFormat) -> String {
        let magic = &fmt.magic;
        let mut html = String::new();
        html.push_str(
            "<p><span style=\"text-decoration: underline;\">Automated test output</span>:</p>",
        );
        html.push_str(&format!(
            "<pre class=\"language-markup\"><code>{magic}{}{magic}</code></pre>",
            self.test_output
        ));

        if !self.additional_feedback.is_empty() {
            let lines: Vec<&str> = self.additional_feedback.lines().collect();
            html.push_str(
                "<p><span style=\"text-decoration: underline;\">Additional feedback</span>:</p>",
            );
            html.push_str(&format!("{magic}{}{magic}", encode_comment(&lines)));
        }

        html
    }

    /// Decode a record from a stored comment payload plus the points held in
    /// the gradebook row. Missing segments decode to empty fields.
    pub fn from_html(html: &str, points: Option<f64>, fmt: &FeedbackFormat) -> Self {
        let segments: Vec<&str> = html.split(fmt.magic.as_str()).collect();
        let test_output = segments.get(1).map(|s| s.trim()).unwrap_or("");
        let additional_feedback = segments
            .get(3)
            .map(|s| decode_comment(s.trim()).join("\n"))
            .unwrap_or_default();

        Self::new(points, test_output, &additional_feedback)
    }

    /// Render the structured plain-text form handed to the grader's editor.
    pub fn to_editable_text(&self, header: Option<&str>, fmt: &FeedbackFormat) -> String {
        let div = &fmt.divider;
        let points = self
            .points
            .map(|p| p.to_string())
            .unwrap_or_default();

        let mut text = String::new();
        if let Some(header) = header {
            text.push_str(header);
            text.push('\n');
        }
        text.push_str(&format!(
            "# Lines starting with '#' are ignored. Do not remove lines starting with '{div}'.\n\n"
        ));
        text.push_str(&format!("# Test Output:\n{div}{}{div}\n\n", self.test_output));
        text.push_str(&format!(
            "# Additional Feedback:\n{div}{}{div}\n\n",
            self.additional_feedback
        ));
        text.push_str(&format!("# Points:\n{div}{points}{div}\n"));

        text
    }

    /// Parse the editable text form back into a record.
    ///
    /// Blank lines and `#`-prefixed comment lines are stripped first; the
    /// remainder splits on the divider into test output, additional feedback
    /// and points. An unparseable points section decodes to "absent".
    pub fn from_editable_text(text: &str, fmt: &FeedbackFormat) -> Self {
        let filtered: Vec<&str> = text
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        let joined = filtered.join("\n");

        let sections: Vec<&str> = joined.split(fmt.divider.as_str()).collect();
        let test_output = sections.get(1).copied().unwrap_or("");
        let additional_feedback = sections.get(3).copied().unwrap_or("");
        let points = sections
            .get(5)
            .and_then(|s| s.trim().replace(',', ".").parse::<f64>().ok());

        Self::new(points, test_output, additional_feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FeedbackRecord {
        FeedbackRecord::new(Some(8.5), "3/3 tests passed", "Nice solution.\nMinor style issues.")
    }

    #[test]
    fn validity_requires_real_nonnegative_points_and_output() {
        assert!(record().is_valid());

        let zero = FeedbackRecord::new(Some(0.0), "0/3 tests passed", "");
        assert!(zero.is_valid());

        let absent = FeedbackRecord::new(None, "output", "");
        assert!(!absent.is_valid());

        let nan = FeedbackRecord::new(Some(f64::NAN), "output", "");
        assert!(!nan.is_valid());

        let negative = FeedbackRecord::new(Some(-1.0), "output", "");
        assert!(!negative.is_valid());

        let no_output = FeedbackRecord::new(Some(5.0), "", "");
        assert!(!no_output.is_valid());
    }

    #[test]
    fn html_round_trips_through_the_magic_delimiter() {
        let fmt = FeedbackFormat::default();
        let original = record();

        let html = original.to_html(&fmt);
        assert_eq!(html.matches(fmt.magic.as_str()).count(), 4);
        assert!(html.contains("<pre class=\"language-markup\"><code>"));
        assert!(html.contains("<p>Nice solution.</p><p>Minor style issues.</p>"));

        let decoded = FeedbackRecord::from_html(&html, Some(8.5), &fmt);
        assert_eq!(decoded, original);
    }

    #[test]
    fn html_without_additional_feedback_has_two_delimiters() {
        let fmt = FeedbackFormat::default();
        let rec = FeedbackRecord::new(Some(1.0), "ok", "");
        let html = rec.to_html(&fmt);
        assert_eq!(html.matches(fmt.magic.as_str()).count(), 2);

        let decoded = FeedbackRecord::from_html(&html, Some(1.0), &fmt);
        assert_eq!(decoded.additional_feedback(), "");
        assert_eq!(decoded.test_output(), "ok");
    }

    #[test]
    fn editable_text_round_trips() {
        let fmt = FeedbackFormat::default();
        let original = record();

        let text = original.to_editable_text(Some("# Group 1 (Alice, Bob)"), &fmt);
        let decoded = FeedbackRecord::from_editable_text(&text, &fmt);
        assert_eq!(decoded, original);
    }

    #[test]
    fn editable_text_ignores_comments_and_blank_lines() {
        let fmt = FeedbackFormat::default();
        let text = "\n# some note\n%out%\n\n%extra%\n# Points:\n%7,5%\n";
        let decoded = FeedbackRecord::from_editable_text(text, &fmt);
        assert_eq!(decoded.test_output(), "out");
        assert_eq!(decoded.additional_feedback(), "extra");
        assert_eq!(decoded.points(), Some(7.5));
    }

    #[test]
    fn garbled_points_decode_to_absent() {
        let fmt = FeedbackFormat::default();
        let text = "%out%\n%%\n%not a number%";
        let decoded = FeedbackRecord::from_editable_text(text, &fmt);
        assert_eq!(decoded.points(), None);
    }

    #[test]
    fn setters_are_the_only_mutation_path() {
        let mut rec = FeedbackRecord::default();
        rec.set_points(Some(3.0));
        rec.set_test_output("  padded  ");
        rec.set_additional_feedback("fb");
        assert_eq!(rec.test_output(), "padded");
        assert!(rec.is_valid());

        let mut other = FeedbackRecord::default();
        other.replace_with(rec.clone());
        assert_eq!(other, rec);
    }
}
