use crate::error::RunnerError;
use log::{info, warn};
use marker::report::GradeReport;
use marker::traits::grader::{GradeOutcome, Grader};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};
use util::archive::unzip_if_not_folder;
use util::locator::{FirstMatch, find_single};
use util::temp::TempStack;

/// Derive the exercise name from a grading package path.
///
/// Packages are named `<course>_<exercise>_grading(.zip)`; the middle token
/// names the exercise the Docker image is built for.
pub fn exercise_name_from(package: &Path) -> Result<String, RunnerError> {
    let stem = package
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| RunnerError::BadPackageName(package.display().to_string()))?;

    stem.split('_')
        .nth(1)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .ok_or_else(|| RunnerError::BadPackageName(stem.to_string()))
}

/// Grades submissions by running the exercise's grading container.
///
/// One image is built per session from the grading package; each
/// [`Grader::grade`] call mounts a scratch folder with the submission,
/// runs the container to completion and parses the JSON report it leaves
/// behind.
pub struct DockerGrader {
    exercise: String,
    package_dir: PathBuf,
    group_name: String,
    image: String,
    /// Session temp-folder registry; grading scratch space is tracked here
    /// so an interrupt can still clean it up.
    temp: Arc<Mutex<TempStack>>,
}

impl DockerGrader {
    /// Unpack the grading package (if it is an archive) and build the image.
    pub fn prepare(
        package: &Path,
        group_name: &str,
        temp: Arc<Mutex<TempStack>>,
    ) -> Result<Self, RunnerError> {
        let exercise = exercise_name_from(package)?;
        let package_dir = {
            let mut temp = temp.lock().expect("temp stack lock");
            unzip_if_not_folder(package, &mut temp)?
        };
        let image = format!("{exercise}-docker");

        info!("Preparing Docker image '{image}' ...");
        run_docker(&[
            "build",
            "-t",
            &image,
            "--build-arg",
            &format!("exercise={exercise}"),
            &package_dir.display().to_string(),
        ])?;

        Ok(Self {
            exercise,
            package_dir,
            group_name: group_name.to_string(),
            image,
            temp,
        })
    }

    /// The reference solution notebook shipped inside the grading package.
    pub fn reference_solution(&self) -> Result<PathBuf, RunnerError> {
        let solutions_dir = self.package_dir.join(&self.exercise).join("python");
        Ok(find_single("*.ipynb", &solutions_dir, None, &mut FirstMatch)?)
    }

    /// Remove the session's Docker image.
    pub fn cleanup(&self) -> Result<(), RunnerError> {
        info!("Cleaning up Docker image '{}' ...", self.image);
        run_docker(&["rmi", &self.image])?;
        Ok(())
    }

    fn try_grade(&self, submission: &Path) -> Result<GradeOutcome, RunnerError> {
        // Scratch layout expected by the grading scripts:
        //   <scratch>/<exercise>/group-<name>/   <- submission copy
        //   <scratch>/<exercise>-grading/        <- report target
        let base = submission.parent().unwrap_or_else(|| Path::new("."));
        let grading_folder = {
            let mut temp = self.temp.lock().expect("temp stack lock");
            temp.create_dir(base)?
        };
        let source = grading_folder
            .join(&self.exercise)
            .join(format!("group-{}", self.group_name));
        let target = grading_folder.join(format!("{}-grading", self.exercise));
        fs::create_dir_all(&source)?;
        fs::create_dir_all(&target)?;

        let file_name = submission
            .file_name()
            .ok_or_else(|| RunnerError::BadPackageName(submission.display().to_string()))?;
        fs::copy(submission, source.join(file_name))?;

        info!("Grading submission '{}' ...", submission.display());
        let grading_folder = fs::canonicalize(&grading_folder)?;
        let target_abs = fs::canonicalize(&target)?;
        run_docker(&[
            "run",
            "--rm",
            "--mount",
            &format!(
                "type=bind,source={},target=/submissions",
                grading_folder.display()
            ),
            "--mount",
            &format!(
                "type=bind,source={},target=/grading_schemes",
                target_abs.display()
            ),
            "--name",
            &format!("{}-group-{}", self.image, self.group_name),
            &self.image,
            &self.exercise,
            &self.group_name,
        ])?;

        let report_file = find_single("*.json", &target, None, &mut FirstMatch)?;
        let raw = fs::read_to_string(&report_file)?;
        let report = GradeReport::from_json(&raw)?;

        let outcome = GradeOutcome {
            transcript: report.transcript(),
            points: report.reached(),
        };

        // scratch space is not needed between runs; the registry entry
        // stays behind and is skipped as already-deleted on teardown
        fs::remove_dir_all(&grading_folder)?;

        Ok(outcome)
    }
}

impl Grader for DockerGrader {
    /// A failed grading run never aborts the session: the failure text
    /// becomes the transcript and the points are zero, so the grader still
    /// gets a record to review by hand.
    fn grade(&mut self, submission: &Path) -> GradeOutcome {
        match self.try_grade(submission) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "grading '{}' failed: {e}. Recording a failing result for manual review.",
                    submission.display()
                );
                GradeOutcome::failure(&e.to_string())
            }
        }
    }
}

fn run_docker(args: &[&str]) -> Result<String, RunnerError> {
    let output = Command::new("docker").args(args).output()?;
    if !output.status.success() {
        let verb = args.first().copied().unwrap_or("command").to_string();
        return Err(RunnerError::Docker(
            verb,
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
