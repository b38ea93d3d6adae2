use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(
        "unexpected name of grading package '{0}'. Expected something like 'sc_pex4_grading'"
    )]
    BadPackageName(String),

    #[error("docker {0} failed:\n{1}")]
    Docker(String, String),

    #[error(transparent)]
    Util(#[from] util::UtilError),

    #[error(transparent)]
    Marker(#[from] marker::MarkerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
