//! The per-group review state machine.
//!
//! One group moves through `UNSCORED → REVIEW ⇄ (regrade | edit) →
//! FINALIZED`, with a cached branch when the gradebook already holds a
//! result for every member. All branching runs on typed actions fed by an
//! injected [`Prompter`], so the machine is testable with scripted input.
//!
//! Finalize is deliberately not transactional across a group's members:
//! rows are written one by one and the sheet is saved after every group, so
//! an interruption loses at most the in-progress group (save-as-you-go).

use crate::input::Prompter;
use anyhow::Result;
use gradebook::GradingSheet;
use log::warn;
use marker::{FeedbackFormat, FeedbackRecord, Grader};
use std::fs;
use std::path::Path;

/// What to do with a group that already has a cached result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CachedAction {
    Skip,
    LoadCached,
    Regrade,
}

/// Actions available in the REVIEW state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReviewAction {
    OpenSolution,
    OpenSubmission,
    Regrade,
    Edit,
    Finalize,
}

/// Everything needed to review one group.
pub struct GroupReview<'a> {
    /// 1-based group number, for display.
    pub group_number: usize,
    pub members: &'a [String],
    pub member_ids: &'a [i64],
    /// The representative submission file handed to the grader.
    pub submission: &'a Path,
    /// Reference solution, when the grading package ships one.
    pub solution: Option<&'a Path>,
    pub fmt: &'a FeedbackFormat,
    /// Footer HTML appended to every finalized comment.
    pub footer_html: &'a str,
    /// Scratch file for the edit action.
    pub edit_file: &'a Path,
}

impl GroupReview<'_> {
    /// Run the state machine to completion. Returns the number of member
    /// rows updated (0 when the group was skipped).
    pub fn run(
        &self,
        grader: &mut dyn Grader,
        sheet: &mut GradingSheet,
        prompter: &mut dyn Prompter,
        open: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<usize> {
        let mut record = if self.has_cached_result(sheet)? {
            match self.ask_cached_action(prompter)? {
                CachedAction::Skip => return Ok(0),
                CachedAction::LoadCached => {
                    let id = self.member_ids[0];
                    FeedbackRecord::from_html(
                        &sheet.get_comment(id)?,
                        sheet.get_points(id)?,
                        self.fmt,
                    )
                }
                CachedAction::Regrade => self.auto_grade(grader, &FeedbackRecord::default()),
            }
        } else {
            self.auto_grade(grader, &FeedbackRecord::default())
        };

        loop {
            self.show_record(&record, prompter);
            match self.ask_review_action(prompter)? {
                ReviewAction::OpenSolution => match self.solution {
                    Some(solution) => open(solution)?,
                    None => prompter.show("No reference solution available."),
                },
                ReviewAction::OpenSubmission => open(self.submission)?,
                ReviewAction::Regrade => record = self.auto_grade(grader, &record),
                ReviewAction::Edit => self.edit(&mut record, prompter, open)?,
                ReviewAction::Finalize => {
                    if let Some(points) = record.points().filter(|_| record.is_valid()) {
                        return Ok(self.commit(points, &record, sheet)?);
                    }
                    warn!(
                        "feedback is not valid yet (needs non-negative points and non-empty test output). Not finalizing."
                    );
                }
            }
        }
    }

    /// Every member already has points and a comment in the gradebook.
    fn has_cached_result(&self, sheet: &GradingSheet) -> Result<bool> {
        for &id in self.member_ids {
            if sheet.get_points(id)?.is_none() || sheet.get_comment(id)?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn ask_cached_action(&self, prompter: &mut dyn Prompter) -> Result<CachedAction> {
        let answer = prompter.choose_option(
            &["s", "l", "r"],
            Some("l"),
            "A cached result exists for this group. [s]kip, [l]oad cached, [r]egrade?",
        )?;
        Ok(match answer.as_str() {
            "s" => CachedAction::Skip,
            "r" => CachedAction::Regrade,
            _ => CachedAction::LoadCached,
        })
    }

    fn ask_review_action(&self, prompter: &mut dyn Prompter) -> Result<ReviewAction> {
        let answer = prompter.choose_option(
            &["s", "o", "r", "e", "f"],
            None,
            "open [s]olution, [o]pen submission, [r]egrade, [e]dit, [f]inalize?",
        )?;
        Ok(match answer.as_str() {
            "s" => ReviewAction::OpenSolution,
            "o" => ReviewAction::OpenSubmission,
            "r" => ReviewAction::Regrade,
            "e" => ReviewAction::Edit,
            _ => ReviewAction::Finalize,
        })
    }

    /// Run the external grader. Manual feedback entered so far survives a
    /// regrade; only points and test output are replaced.
    fn auto_grade(&self, grader: &mut dyn Grader, previous: &FeedbackRecord) -> FeedbackRecord {
        let outcome = grader.grade(self.submission);
        FeedbackRecord::new(
            Some(outcome.points),
            &outcome.transcript,
            previous.additional_feedback(),
        )
    }

    /// Hand the record to the grader's editor and re-parse it afterwards.
    fn edit(
        &self,
        record: &mut FeedbackRecord,
        prompter: &mut dyn Prompter,
        open: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<()> {
        let header = format!(
            "# Editing feedback for group {} ({})",
            self.group_number,
            self.members.join(", ")
        );
        fs::write(self.edit_file, record.to_editable_text(Some(&header), self.fmt))?;
        open(self.edit_file)?;
        prompter.wait("Please edit the feedback, save the file and press ENTER to continue...")?;

        let text = fs::read_to_string(self.edit_file)?;
        record.replace_with(FeedbackRecord::from_editable_text(&text, self.fmt));
        fs::remove_file(self.edit_file)?;
        Ok(())
    }

    /// Write the record into every member's gradebook row: points, the HTML
    /// payload as the comment, then the footer, exactly once per finalize.
    fn commit(
        &self,
        points: f64,
        record: &FeedbackRecord,
        sheet: &mut GradingSheet,
    ) -> Result<usize, gradebook::GradebookError> {
        let html = record.to_html(self.fmt);
        for &id in self.member_ids {
            sheet.set_points(id, points)?;
            sheet.set_comment(id, &html)?;
            sheet.append_comment(id, self.footer_html)?;
        }
        Ok(self.member_ids.len())
    }

    fn show_record(&self, record: &FeedbackRecord, prompter: &mut dyn Prompter) {
        let points = record
            .points()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "none".to_string());
        prompter.show(&format!(
            "\nGroup {}: {}\nPoints: {points}\nTest output:\n{}\nAdditional feedback: {}",
            self.group_number,
            self.members.join(", "),
            record.test_output(),
            if record.additional_feedback().is_empty() {
                "(none)"
            } else {
                record.additional_feedback()
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedPrompter;
    use marker::GradeOutcome;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::{NamedTempFile, tempdir};

    struct FixedGrader(GradeOutcome);

    impl Grader for FixedGrader {
        fn grade(&mut self, _submission: &Path) -> GradeOutcome {
            self.0.clone()
        }
    }

    fn sheet_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Identifier,Full name,Grade,Feedback comments").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file
    }

    fn review<'a>(
        members: &'a [String],
        ids: &'a [i64],
        submission: &'a Path,
        fmt: &'a FeedbackFormat,
        edit_file: &'a Path,
    ) -> GroupReview<'a> {
        GroupReview {
            group_number: 1,
            members,
            member_ids: ids,
            submission,
            solution: None,
            fmt,
            footer_html: "<strong>- AB</strong>",
            edit_file,
        }
    }

    fn noop_open() -> impl FnMut(&Path) -> Result<()> {
        |_| Ok(())
    }

    #[test]
    fn finalize_writes_every_member_once() {
        let file = sheet_file(&["Participant 101,Alice,,", "Participant 102,Bob,,"]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();
        let fmt = FeedbackFormat::default();
        let members = vec!["Alice".to_string(), "Bob".to_string()];
        let ids = vec![101, 102];
        let dir = tempdir().unwrap();
        let edit_file = dir.path().join("edit.txt");
        let submission = PathBuf::from("sub.ipynb");

        let mut grader = FixedGrader(GradeOutcome {
            transcript: "3/3 tests passed".to_string(),
            points: 8.5,
        });
        let mut prompter = ScriptedPrompter::new(["f"]);
        let mut open = noop_open();

        let r = review(&members, &ids, &submission, &fmt, &edit_file);
        let updated = r
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        assert_eq!(updated, 2);
        for id in [101, 102] {
            assert_eq!(sheet.get_points(id).unwrap(), Some(8.5));
            let comment = sheet.get_comment(id).unwrap();
            assert!(comment.contains("3/3 tests passed"));
            assert_eq!(comment.matches("<strong>- AB</strong>").count(), 1);
        }
    }

    #[test]
    fn invalid_record_cannot_be_finalized() {
        let file = sheet_file(&["Participant 101,Alice,,"]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();
        let fmt = FeedbackFormat::default();
        let members = vec!["Alice".to_string()];
        let ids = vec![101];
        let dir = tempdir().unwrap();
        let edit_file = dir.path().join("edit.txt");
        let submission = PathBuf::from("sub.ipynb");

        // empty transcript -> invalid record, finalize must be refused
        let mut grader = FixedGrader(GradeOutcome {
            transcript: "".to_string(),
            points: 5.0,
        });
        // rejected finalize, then an edit that fixes the record, then finalize
        let mut prompter = ScriptedPrompter::new(["f", "e", "", "f"]);
        let mut open = |path: &Path| -> Result<()> {
            // simulate the grader fixing the record in their editor
            fs::write(path, "%2/3 tests passed%\n%better luck%\n%5%")?;
            Ok(())
        };

        let r = review(&members, &ids, &submission, &fmt, &edit_file);
        let updated = r
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(sheet.get_points(101).unwrap(), Some(5.0));
        let comment = sheet.get_comment(101).unwrap();
        assert!(comment.contains("2/3 tests passed"));
        assert!(comment.contains("<p>better luck</p>"));
    }

    #[test]
    fn skip_leaves_the_gradebook_untouched() {
        let fmt = FeedbackFormat::default();
        let cached = FeedbackRecord::new(Some(4.0), "1/3 tests passed", "").to_html(&fmt);
        let row = format!("Participant 101,Alice,\"4,0\",{}", cached.replace(',', ";"));
        // avoid commas inside the unquoted CSV fixture
        let file = sheet_file(&[row.as_str()]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();
        let before = sheet.get_comment(101).unwrap();

        let members = vec!["Alice".to_string()];
        let ids = vec![101];
        let dir = tempdir().unwrap();
        let edit_file = dir.path().join("edit.txt");
        let submission = PathBuf::from("sub.ipynb");

        let mut grader = FixedGrader(GradeOutcome {
            transcript: "should not run".to_string(),
            points: 0.0,
        });
        let mut prompter = ScriptedPrompter::new(["s"]);
        let mut open = noop_open();

        let r = review(&members, &ids, &submission, &fmt, &edit_file);
        let updated = r
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        assert_eq!(updated, 0);
        assert_eq!(sheet.get_comment(101).unwrap(), before);
    }

    #[test]
    fn cached_record_can_be_loaded_and_finalized() {
        let fmt = FeedbackFormat::default();
        let cached = FeedbackRecord::new(Some(4.0), "1/3 tests passed", "").to_html(&fmt);
        let row = format!("Participant 101,Alice,\"4,0\",{}", cached.replace(',', ";"));
        let file = sheet_file(&[row.as_str()]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();

        let members = vec!["Alice".to_string()];
        let ids = vec![101];
        let dir = tempdir().unwrap();
        let edit_file = dir.path().join("edit.txt");
        let submission = PathBuf::from("sub.ipynb");

        let mut grader = FixedGrader(GradeOutcome {
            transcript: "should not run".to_string(),
            points: 0.0,
        });
        let mut prompter = ScriptedPrompter::new(["l", "f"]);
        let mut open = noop_open();

        let r = review(&members, &ids, &submission, &fmt, &edit_file);
        let updated = r
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(sheet.get_points(101).unwrap(), Some(4.0));
        assert!(sheet.get_comment(101).unwrap().contains("1/3 tests passed"));
    }

    #[test]
    fn grader_failure_still_yields_a_reviewable_record() {
        let file = sheet_file(&["Participant 101,Alice,,"]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();
        let fmt = FeedbackFormat::default();
        let members = vec!["Alice".to_string()];
        let ids = vec![101];
        let dir = tempdir().unwrap();
        let edit_file = dir.path().join("edit.txt");
        let submission = PathBuf::from("sub.ipynb");

        let mut grader = FixedGrader(GradeOutcome::failure("docker run failed: no image"));
        let mut prompter = ScriptedPrompter::new(["f"]);
        let mut open = noop_open();

        let r = review(&members, &ids, &submission, &fmt, &edit_file);
        let updated = r
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        // 0 points + failure transcript is a *valid* record
        assert_eq!(updated, 1);
        assert_eq!(sheet.get_points(101).unwrap(), Some(0.0));
        assert!(sheet.get_comment(101).unwrap().contains("docker run failed"));
    }
}
