//! Drives one grading session across the whole roster.
//!
//! For each group the runner resolves the members to gradebook rows, hunts
//! down a representative submission file and hands both to the review state
//! machine. The sheet is written back after every group, so an interrupted
//! session loses at most the group being reviewed.

use crate::input::{Prompter, PrompterChooser};
use crate::review::GroupReview;
use anyhow::{Result, bail};
use gradebook::GradingSheet;
use log::{info, warn};
use marker::{FeedbackFormat, Grader};
use std::path::{Path, PathBuf};
use util::UtilError;
use util::locator::{find_all, find_single};
use util::roster::Group;

#[derive(Debug, Default, PartialEq)]
pub struct SessionSummary {
    /// Groups whose review ended in a finalize (skipped groups don't count).
    pub groups_graded: usize,
    /// Gradebook rows written across all finalized groups.
    pub rows_updated: usize,
    /// Members across the whole roster, graded or not.
    pub members_total: usize,
}

pub struct SessionRunner<'a> {
    pub groups: &'a [Group],
    /// Root of the (already extracted) submission download.
    pub submissions_root: &'a Path,
    /// Name fragment marking submission folders, e.g. `assignsubmission_file`.
    pub submission_keyword: &'a str,
    pub solution: Option<&'a Path>,
    pub fmt: &'a FeedbackFormat,
    pub footer_html: &'a str,
    pub edit_file: &'a Path,
    /// Where the sheet is saved after every group.
    pub sheet_out: &'a Path,
}

impl SessionRunner<'_> {
    pub fn run(
        &self,
        grader: &mut dyn Grader,
        sheet: &mut GradingSheet,
        prompter: &mut dyn Prompter,
        open: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<SessionSummary> {
        let mut summary = SessionSummary {
            members_total: self.groups.iter().map(|g| g.members.len()).sum(),
            ..SessionSummary::default()
        };

        for (group_index, group) in self.groups.iter().enumerate() {
            let number = group_index + 1;
            info!(
                "group {number}/{}: {}.",
                self.groups.len(),
                group.members.join(", ")
            );

            let ids = resolve_member_ids(sheet, &group.members, prompter)?;
            let submission = match self.locate_submission(&group.members, prompter)? {
                Some(path) => path,
                None => {
                    warn!("no submission found for group {number}; skipping it.");
                    continue;
                }
            };

            let review = GroupReview {
                group_number: number,
                members: &group.members,
                member_ids: &ids,
                submission: &submission,
                solution: self.solution,
                fmt: self.fmt,
                footer_html: self.footer_html,
                edit_file: self.edit_file,
            };
            let updated = review.run(grader, sheet, prompter, open)?;
            if updated > 0 {
                summary.groups_graded += 1;
                summary.rows_updated += updated;
            }

            // save-as-you-go
            sheet.save(self.sheet_out)?;

            if group_index + 1 < self.groups.len() {
                let answer =
                    prompter.choose_option(&["y", "n"], Some("y"), "Continue with the next group?")?;
                if answer == "n" {
                    info!("session stopped after group {number}.");
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Find the file to grade for a group: try each member in order until
    /// one has a submission folder (or file) below the root. A folder match
    /// narrows further to a single file inside it.
    fn locate_submission(
        &self,
        members: &[String],
        prompter: &mut dyn Prompter,
    ) -> Result<Option<PathBuf>> {
        for member in members {
            let pattern = format!("*{member}*{}*", self.submission_keyword);
            let found = {
                let mut chooser = PrompterChooser(&mut *prompter);
                find_single(&pattern, self.submissions_root, None, &mut chooser)
            };
            match found {
                Ok(path) if path.is_dir() => {
                    if let Some(file) = pick_file_in(&path, prompter)? {
                        return Ok(Some(file));
                    }
                    warn!("submission folder '{}' is empty.", path.display());
                }
                Ok(path) => return Ok(Some(path)),
                Err(UtilError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

/// Map each member name to its gradebook row. An unmatched name is fatal:
/// finishing a session with a member silently missing from the sheet would
/// lose their grade.
fn resolve_member_ids(
    sheet: &GradingSheet,
    members: &[String],
    prompter: &mut dyn Prompter,
) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(members.len());
    for member in members {
        let hits = sheet.find_participants(member);
        match hits.len() {
            0 => bail!("'{member}' does not match any participant in the grading sheet"),
            1 => ids.push(hits[0].0),
            _ => {
                let items: Vec<String> =
                    hits.iter().map(|(id, name)| format!("{name} ({id})")).collect();
                let index = prompter.choose_index(
                    &items,
                    &format!("Multiple participants match '{member}':"),
                    "Select the correct participant:",
                )?;
                ids.push(hits[index].0);
            }
        }
    }
    Ok(ids)
}

fn pick_file_in(folder: &Path, prompter: &mut dyn Prompter) -> Result<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = find_all("*", folder)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect();

    match files.len() {
        0 => Ok(None),
        1 => Ok(Some(files.remove(0))),
        _ => {
            let items: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
            let index = prompter.choose_index(
                &items,
                "The submission folder holds several files:",
                "Select the file to grade:",
            )?;
            Ok(Some(files.remove(index)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScriptedPrompter;
    use marker::GradeOutcome;
    use std::fs::{self, File};
    use std::io::Write;
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

    #[test]
    fn grades_groups_and_skips_those_without_a_submission() {
        let root = tempdir().unwrap();
        let folder = root
            .path()
            .join("Alice Smith_55_assignsubmission_file");
        fs::create_dir(&folder).unwrap();
        File::create(folder.join("solution.ipynb")).unwrap();
        // no folder for Carol's group

        let file = sheet_file(&[
            "Participant 101,Alice Smith,,",
            "Participant 102,Bob Jones,,",
            "Participant 103,Carol Wu,,",
        ]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();
        let out = NamedTempFile::new().unwrap();

        let groups = vec![
            Group {
                members: vec!["Alice Smith".to_string(), "Bob Jones".to_string()],
            },
            Group {
                members: vec!["Carol Wu".to_string()],
            },
        ];
        let fmt = FeedbackFormat::default();
        let edit_file = root.path().join("edit.txt");

        let runner = SessionRunner {
            groups: &groups,
            submissions_root: root.path(),
            submission_keyword: "assignsubmission_file",
            solution: None,
            fmt: &fmt,
            footer_html: "<strong>- AB</strong>",
            edit_file: &edit_file,
            sheet_out: out.path(),
        };

        let mut grader = FixedGrader(GradeOutcome {
            transcript: "3/3 tests passed".to_string(),
            points: 9.0,
        });
        // group 1: finalize; continue prompt: default (yes); group 2 is skipped
        let mut prompter = ScriptedPrompter::new(["f", ""]);
        let mut open = |_: &Path| -> Result<()> { Ok(()) };

        let summary = runner
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        assert_eq!(summary.groups_graded, 1);
        assert_eq!(summary.rows_updated, 2);
        assert_eq!(summary.members_total, 3);

        let saved = GradingSheet::load(out.path()).unwrap();
        assert_eq!(saved.get_points(101).unwrap(), Some(9.0));
        assert_eq!(saved.get_points(102).unwrap(), Some(9.0));
        assert_eq!(saved.get_points(103).unwrap(), None);
    }

    #[test]
    fn stopping_between_groups_leaves_the_rest_ungraded() {
        let root = tempdir().unwrap();
        for name in ["Alice Smith_1_assignsubmission_file", "Bob Jones_2_assignsubmission_file"] {
            let folder = root.path().join(name);
            fs::create_dir(&folder).unwrap();
            File::create(folder.join("work.ipynb")).unwrap();
        }

        let file = sheet_file(&["Participant 101,Alice Smith,,", "Participant 102,Bob Jones,,"]);
        let mut sheet = GradingSheet::load(file.path()).unwrap();
        let out = NamedTempFile::new().unwrap();

        let groups = vec![
            Group {
                members: vec!["Alice Smith".to_string()],
            },
            Group {
                members: vec!["Bob Jones".to_string()],
            },
        ];
        let fmt = FeedbackFormat::default();
        let edit_file = root.path().join("edit.txt");

        let runner = SessionRunner {
            groups: &groups,
            submissions_root: root.path(),
            submission_keyword: "assignsubmission_file",
            solution: None,
            fmt: &fmt,
            footer_html: "<strong>- AB</strong>",
            edit_file: &edit_file,
            sheet_out: out.path(),
        };

        let mut grader = FixedGrader(GradeOutcome {
            transcript: "ok".to_string(),
            points: 5.0,
        });
        let mut prompter = ScriptedPrompter::new(["f", "n"]);
        let mut open = |_: &Path| -> Result<()> { Ok(()) };

        let summary = runner
            .run(&mut grader, &mut sheet, &mut prompter, &mut open)
            .unwrap();

        assert_eq!(summary.groups_graded, 1);
        assert_eq!(summary.members_total, 2);
        let saved = GradingSheet::load(out.path()).unwrap();
        assert_eq!(saved.get_points(102).unwrap(), None);
    }

    #[test]
    fn ambiguous_member_names_go_through_the_prompter() {
        let file = sheet_file(&[
            "Participant 101,Anna Schmidt,,",
            "Participant 102,Anna Schmidt-Berg,,",
        ]);
        let sheet = GradingSheet::load(file.path()).unwrap();

        let mut prompter = ScriptedPrompter::new(["1"]);
        let ids =
            resolve_member_ids(&sheet, &["Anna Schmidt".to_string()], &mut prompter).unwrap();
        assert_eq!(ids, vec![102]);
    }

    #[test]
    fn unknown_member_names_are_fatal() {
        let file = sheet_file(&["Participant 101,Alice Smith,,"]);
        let sheet = GradingSheet::load(file.path()).unwrap();

        let mut prompter = ScriptedPrompter::new(Vec::<String>::new());
        let err = resolve_member_ids(&sheet, &["Nobody".to_string()], &mut prompter).unwrap_err();
        assert!(err.to_string().contains("Nobody"));
    }
}
