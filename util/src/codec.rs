//! Submission filename convention.
//!
//! Grading metadata (group, member, participant id, file index, points)
//! travels inside the filename of every submission copy:
//!
//! `Submission_Gr<N><letter>_<member>_<id>_File <k>_<points>pts<ext>`
//!
//! The grader later replaces the points placeholder by hand with the actual
//! score, so the decoder has to treat an unparseable points token as "not
//! graded yet" rather than as an error.

use crate::error::UtilError;
use std::path::Path;

/// Encode a zero-based member position as its letter suffix.
///
/// Positions 0..=25 map to `a..=z`; overflow positions continue with a `z`
/// prefix: 26 is `za`, 51 is `zz`, 52 is `zaa` and so on.
pub fn index_to_letters(index: usize) -> String {
    if index < 26 {
        letter(index).to_string()
    } else {
        format!("z{}", base26(index - 26))
    }
}

fn base26(index: usize) -> String {
    if index < 26 {
        letter(index).to_string()
    } else {
        format!("{}{}", base26(index / 26 - 1), letter(index % 26))
    }
}

fn letter(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

/// Build the stem of a submission copy for one member's file.
///
/// `group_index` and `member_index` are zero-based; `file_index` is the
/// 1-based position of the file inside the member's submission folder and
/// may carry a nesting prefix (e.g. `2-1`).
pub fn submission_filename(
    group_index: usize,
    member_index: usize,
    member: &str,
    participant_id: &str,
    file_index: &str,
    points_placeholder: &str,
) -> String {
    let (prefix, suffix) =
        submission_name_parts(group_index, member_index, member, participant_id, points_placeholder);
    format!("{prefix}{file_index}{suffix}")
}

/// The (prefix, suffix) pair around the file index, for callers that insert
/// the index themselves while flatten-copying a submission folder.
pub fn submission_name_parts(
    group_index: usize,
    member_index: usize,
    member: &str,
    participant_id: &str,
    points_placeholder: &str,
) -> (String, String) {
    (
        format!(
            "Submission_Gr{}{}_{}_{}_File ",
            group_index + 1,
            index_to_letters(member_index),
            member,
            participant_id
        ),
        format!("_{points_placeholder}pts"),
    )
}

/// Name for a feedback copy returned to the platform.
pub fn feedback_filename(
    member: &str,
    participant_id: &str,
    submission_keyword: &str,
    feedback_prefix: &str,
    submission_name: Option<&str>,
    file_index: &str,
    extension: &str,
) -> String {
    let mut name = format!("{member}_{participant_id}_{submission_keyword}_{feedback_prefix}");
    if let Some(sub) = submission_name {
        name.push('_');
        name.push_str(sub);
    }
    name.push_str(&format!("_(File {file_index}){extension}"));
    name
}

/// Metadata decoded from a submission copy's filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSubmission {
    pub member: String,
    pub participant_id: String,
    pub file_index: String,
    /// `None` while the points token is still the placeholder (or otherwise
    /// unparseable); that means "not graded yet", not an error.
    pub points: Option<f64>,
}

/// Decode a submission copy's filename back into its metadata.
///
/// The stem is split on `_`; fewer than 6 tokens means the file does not
/// follow the convention at all and is rejected as malformed.
pub fn parse_submission_filename(path: &Path) -> Result<ParsedSubmission, UtilError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| UtilError::MalformedFilename(path.display().to_string()))?;

    let tokens: Vec<&str> = stem.split('_').collect();
    if tokens.len() < 6 {
        return Err(UtilError::MalformedFilename(stem.to_string()));
    }

    let member = tokens[2].to_string();
    let participant_id = tokens[3].to_string();
    let file_index = tokens[4].replace("File", "").trim().to_string();
    let points_token = tokens[5].replace("pts", "").replace(',', ".");
    let points = points_token.trim().parse::<f64>().ok();

    Ok(ParsedSubmission {
        member,
        participant_id,
        file_index,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn letter_encoding_covers_overflow() {
        assert_eq!(index_to_letters(0), "a");
        assert_eq!(index_to_letters(1), "b");
        assert_eq!(index_to_letters(25), "z");
        assert_eq!(index_to_letters(26), "za");
        assert_eq!(index_to_letters(51), "zz");
        assert_eq!(index_to_letters(52), "zaa");
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let stem = submission_filename(0, 1, "Ada Lovelace", "771234", "2-1", " --- ");
        assert_eq!(stem, "Submission_Gr1b_Ada Lovelace_771234_File 2-1_ --- pts");

        let parsed = parse_submission_filename(&PathBuf::from(format!("{stem}.pdf"))).unwrap();
        assert_eq!(parsed.member, "Ada Lovelace");
        assert_eq!(parsed.participant_id, "771234");
        assert_eq!(parsed.file_index, "2-1");
        assert_eq!(parsed.points, None);
    }

    #[test]
    fn decode_reads_comma_points() {
        let path = PathBuf::from("Submission_Gr3a_Bob_99_File 1_8,5pts.pdf");
        let parsed = parse_submission_filename(&path).unwrap();
        assert_eq!(parsed.points, Some(8.5));
    }

    #[test]
    fn decode_rejects_short_names() {
        let path = PathBuf::from("report_final.pdf");
        assert!(matches!(
            parse_submission_filename(&path),
            Err(UtilError::MalformedFilename(_))
        ));
    }

    #[test]
    fn feedback_filename_includes_optional_submission_name() {
        let name = feedback_filename("Bob", "99", "assignsubmission_file", "Feedback", Some("ex04"), "1", ".pdf");
        assert_eq!(name, "Bob_99_assignsubmission_file_Feedback_ex04_(File 1).pdf");

        let name = feedback_filename("Bob", "99", "assignsubmission_file", "Feedback", None, "1", ".pdf");
        assert_eq!(name, "Bob_99_assignsubmission_file_Feedback_(File 1).pdf");
    }
}
