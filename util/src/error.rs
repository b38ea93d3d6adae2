use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the filesystem/naming toolbox.
///
/// Callers decide whether a variant is fatal or skippable: a failed lookup
/// aborts the session when the unit of work is the whole session, and only
/// skips the current member/group when it isn't.
#[derive(Debug, Error)]
pub enum UtilError {
    #[error("path '{0}' does not exist")]
    PathMissing(PathBuf),

    #[error("no results found for '{0}'")]
    NotFound(String),

    #[error("disambiguation failed for '{0}': {1}")]
    ChooserFailed(String, String),

    #[error("unsupported filename: {0}")]
    MalformedFilename(String),

    #[error("invalid glob pattern '{0}'")]
    BadPattern(String),

    #[error("folders/archives under '{0}' are nested deeper than {1} levels")]
    NestedTooDeep(PathBuf, usize),

    #[error("unsupported archive type: {0}")]
    UnsupportedArchive(String),

    #[error("archive entry escapes the extraction directory: {0}")]
    ArchiveEscape(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
