//! The external grading collaborator: a Docker image built from a grading
//! package, run once per submission, producing a JSON report.

mod error;
mod grader;
mod viewer;

pub use error::RunnerError;
pub use grader::{DockerGrader, exercise_name_from};
pub use viewer::open_path;
