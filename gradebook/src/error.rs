use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradebookError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("grading sheet is missing the '{0}' column")]
    MissingColumn(String),

    #[error("no participant with id {0} in the grading sheet")]
    UnknownParticipant(i64),

    #[error("grade '{0}' is not a number")]
    BadGrade(String),
}
