//! The subcommand implementations: prepare, grade, finish, edit-feedback.

use crate::input::{Prompter, PrompterChooser};
use crate::session::SessionRunner;
use anyhow::{Result, bail};
use common::config::Config;
use gradebook::GradingSheet;
use log::{info, warn};
use marker::FeedbackFormat;
use marker::feedback::{decode_comment, encode_comment};
use runner::{DockerGrader, open_path};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use util::UtilError;
use util::archive::{extract_all_within, unzip_if_not_folder, zip_partitioned};
use util::codec::{ParsedSubmission, feedback_filename, parse_submission_filename, submission_name_parts};
use util::fsops::{check_path, ensure_dir, flatten_copy};
use util::locator::{find_all, find_single};
use util::roster::parse_roster;
use util::temp::TempStack;

/// Unpack the submission download and lay out one flat folder of renamed
/// submission copies, ready for manual grading.
pub fn prepare(
    groups_file: &Path,
    submissions: &Path,
    out: &Path,
    temp: &Arc<Mutex<TempStack>>,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let cfg = Config::get();
    check_path(groups_file)?;
    check_path(submissions)?;

    let root = {
        let mut temp = temp.lock().expect("temp stack lock");
        unzip_if_not_folder(submissions, &mut temp)?
    };
    let groups = parse_roster(groups_file)?;
    ensure_dir(out)?;

    let mut prepared = 0;
    let mut total = 0;
    for (group_index, group) in groups.iter().enumerate() {
        for (member_index, member) in group.members.iter().enumerate() {
            total += 1;
            let folder = match locate_member_folder(member, &cfg.submission_keyword, &root, prompter)? {
                Some(folder) => folder,
                None => {
                    warn!("no submission folder found for '{member}'; skipping.");
                    continue;
                }
            };

            // folder names look like `Full Name_771234_assignsubmission_file`
            let Some(participant_id) = folder
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.split('_').nth(1))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
            else {
                warn!(
                    "folder '{}' carries no participant id; skipping '{member}'.",
                    folder.display()
                );
                continue;
            };

            let (prefix, suffix) = submission_name_parts(
                group_index,
                member_index,
                member,
                &participant_id,
                &cfg.points_placeholder,
            );
            let copied = flatten_copy(&folder, out, &prefix, &suffix)?;
            info!("{copied} file/s prepared for '{member}'.");
            prepared += 1;
        }
    }

    info!(
        "submissions prepared for {prepared}/{total} member/s in '{}'.",
        out.display()
    );
    Ok(())
}

/// Run a full interactive grading session against the Docker grader.
#[allow(clippy::too_many_arguments)]
pub fn grade(
    grading_package: &Path,
    groups_file: &Path,
    submissions: &Path,
    grading_sheet: &Path,
    out_sheet: &Path,
    temp: &Arc<Mutex<TempStack>>,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let cfg = Config::get();
    check_path(grading_package)?;
    check_path(groups_file)?;
    check_path(submissions)?;

    let groups = parse_roster(groups_file)?;
    let mut sheet = GradingSheet::load(grading_sheet)?;

    let root = {
        let mut temp = temp.lock().expect("temp stack lock");
        let root = unzip_if_not_folder(submissions, &mut temp)?;
        extract_all_within(&root, &mut temp)?;
        root
    };

    let mut grader = DockerGrader::prepare(grading_package, &cfg.docker_group_name, Arc::clone(temp))?;
    let solution = match grader.reference_solution() {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("no reference solution found in the grading package: {e}.");
            None
        }
    };

    let fmt = FeedbackFormat {
        magic: cfg.html_magic.clone(),
        divider: cfg.text_divider.clone(),
    };
    let footer = cfg.footer_with_initials();
    let edit_file = std::env::temp_dir().join("pex-tool-feedback-edit.txt");

    let runner = SessionRunner {
        groups: &groups,
        submissions_root: &root,
        submission_keyword: &cfg.submission_keyword,
        solution: solution.as_deref(),
        fmt: &fmt,
        footer_html: &footer,
        edit_file: &edit_file,
        sheet_out: out_sheet,
    };
    let mut open = |path: &Path| -> Result<()> { Ok(open_path(path)?) };
    let summary = runner.run(&mut grader, &mut sheet, prompter, &mut open)?;

    if let Err(e) = grader.cleanup() {
        warn!("Docker cleanup failed: {e}.");
    }

    info!(
        "session finished: {} group/s graded, {}/{} member row/s updated, sheet saved to '{}'.",
        summary.groups_graded,
        summary.rows_updated,
        summary.members_total,
        out_sheet.display()
    );
    Ok(())
}

/// Collect the hand-graded points out of the renamed submission copies,
/// write them into the sheet and bundle feedback copies for re-upload.
#[allow(clippy::too_many_arguments)]
pub fn finish(
    groups_file: &Path,
    grading_sheet: &Path,
    feedback_dir: &Path,
    out_feedback: &Path,
    out_sheet: &Path,
    submission_name: Option<&str>,
    temp: &Arc<Mutex<TempStack>>,
) -> Result<()> {
    let cfg = Config::get();
    check_path(groups_file)?;
    check_path(feedback_dir)?;
    let groups = parse_roster(groups_file)?;
    let mut sheet = GradingSheet::load(grading_sheet)?;

    let by_participant = collect_graded_files(feedback_dir)?;

    // cross-check the roster so a forgotten member is noticed now, not
    // after the upload
    for group in &groups {
        for member in &group.members {
            let seen = by_participant
                .values()
                .any(|files| files.iter().any(|(_, p)| &p.member == member));
            if !seen {
                warn!("no graded files found for roster member '{member}'.");
            }
        }
    }

    let staging = {
        let base = out_feedback.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = temp.lock().expect("temp stack lock");
        temp.create_dir(base)?
    };

    let mut updated_ids = Vec::new();
    for (participant_id, files) in &by_participant {
        let Ok(id) = participant_id.parse::<i64>() else {
            warn!("'{participant_id}' is not a numeric participant id; skipping.");
            continue;
        };

        let graded: Vec<&(PathBuf, ParsedSubmission)> =
            files.iter().filter(|(_, p)| p.points.is_some()).collect();
        if graded.is_empty() {
            warn!(
                "none of the files for '{}' ({id}) carry points yet; skipping.",
                files[0].1.member
            );
            continue;
        }
        for (path, _) in files.iter().filter(|(_, p)| p.points.is_none()) {
            warn!("'{}' has no points; it is left out.", path.display());
        }

        let total: f64 = graded.iter().filter_map(|(_, p)| p.points).sum();
        sheet.set_points(id, total)?;
        sheet.append_comment(id, &cfg.footer_with_initials())?;

        for (path, parsed) in &graded {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            let name = feedback_filename(
                &parsed.member,
                participant_id,
                &cfg.submission_keyword,
                &cfg.feedback_prefix,
                submission_name,
                &parsed.file_index,
                &extension,
            );
            fs::copy(path, staging.join(name))?;
        }

        updated_ids.push(id);
    }

    if updated_ids.is_empty() {
        bail!("no graded submissions found under '{}'", feedback_dir.display());
    }

    sheet.retain(&updated_ids);
    sheet.save(out_sheet)?;

    let archives = zip_partitioned(&staging, out_feedback, cfg.upload_limit_bytes)?;
    info!(
        "{} participant/s finished; {archives} feedback archive/s written.",
        updated_ids.len()
    );
    Ok(())
}

/// Re-open one participant's stored comment in an editor and save the
/// edited version back.
pub fn edit_feedback(
    grading_sheet: &Path,
    student_name: &str,
    out_sheet: &Path,
    prompter: &mut dyn Prompter,
    open: &mut dyn FnMut(&Path) -> Result<()>,
) -> Result<()> {
    let mut sheet = GradingSheet::load(grading_sheet)?;

    let hits = sheet.find_participants(student_name);
    let (id, name) = match hits.len() {
        0 => bail!("'{student_name}' does not match any participant in the grading sheet"),
        1 => hits[0].clone(),
        _ => {
            let items: Vec<String> =
                hits.iter().map(|(id, name)| format!("{name} ({id})")).collect();
            let index = prompter.choose_index(
                &items,
                &format!("Multiple participants match '{student_name}':"),
                "Select the correct participant:",
            )?;
            hits[index].clone()
        }
    };

    let stored = sheet.get_comment(id)?;
    let lines = decode_comment(&stored);

    let edit_file = std::env::temp_dir().join(format!("pex-tool-comment-{id}.txt"));
    let mut text = format!(
        "# Editing the feedback comment for {name} ({id}).\n# Lines starting with '#' are ignored.\n\n"
    );
    text.push_str(&lines.join("\n"));
    text.push('\n');
    fs::write(&edit_file, text)?;

    open(&edit_file)?;
    prompter.wait("Edit the comment, save the file and press ENTER to continue...")?;

    let edited = fs::read_to_string(&edit_file)?;
    fs::remove_file(&edit_file)?;

    let kept: Vec<&str> = edited
        .lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    // compare both sides re-encoded: the stored comment may carry HTML
    // outside <p> tags (the finalize footer), and a no-op edit must not
    // rewrite it into paragraphs
    if encode_comment(&kept) == encode_comment(&lines) {
        warn!("the comment is unchanged; nothing to save.");
        return Ok(());
    }

    sheet.set_comment(id, &encode_comment(&kept))?;
    sheet.save(out_sheet)?;
    Ok(())
}

fn locate_member_folder(
    member: &str,
    keyword: &str,
    root: &Path,
    prompter: &mut dyn Prompter,
) -> Result<Option<PathBuf>> {
    let pattern = format!("*{member}*{keyword}*");
    let only_dirs = |p: &Path| p.is_dir();
    let mut chooser = PrompterChooser(&mut *prompter);
    match find_single(&pattern, root, Some(&only_dirs), &mut chooser) {
        Ok(folder) => Ok(Some(folder)),
        Err(UtilError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All convention-named files below `feedback_dir`, grouped by participant
/// id in stable order.
fn collect_graded_files(
    feedback_dir: &Path,
) -> Result<BTreeMap<String, Vec<(PathBuf, ParsedSubmission)>>> {
    let mut by_participant: BTreeMap<String, Vec<(PathBuf, ParsedSubmission)>> = BTreeMap::new();

    for file in find_all("Submission_Gr*", feedback_dir)? {
        if !file.is_file() {
            continue;
        }
        match parse_submission_filename(&file) {
            Ok(parsed) => by_participant
                .entry(parsed.participant_id.clone())
                .or_default()
                .push((file, parsed)),
            Err(e) => warn!("ignoring '{}': {e}.", file.display()),
        }
    }

    Ok(by_participant)
}
