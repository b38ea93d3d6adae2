//! Small filesystem helpers shared across the workspace.

use crate::error::UtilError;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum folder/archive nesting tolerated inside a submission tree.
pub const MAX_NESTING_DEPTH: usize = 10;

/// Require that a path exists, returning it for chaining.
pub fn check_path(path: &Path) -> Result<&Path, UtilError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(UtilError::PathMissing(path.to_path_buf()))
    }
}

/// Create a directory (and all parents) if it doesn't exist.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!("folder '{}' created.", path.display());
    }
    Ok(())
}

/// Copy every file below `from` into the flat folder `to`, encoding the
/// position of each file into its name: direct children get a 1-based index,
/// files inside nested folders get a dash-joined index path (`2-1`, ...).
///
/// Output names are `{prefix}{index}{suffix}{original extension}`. Walks
/// with an explicit work stack; nesting beyond [`MAX_NESTING_DEPTH`] is a
/// hard error. Returns the number of files copied.
pub fn flatten_copy(
    from: &Path,
    to: &Path,
    prefix: &str,
    suffix: &str,
) -> Result<usize, UtilError> {
    ensure_dir(to)?;

    let mut copied = 0;
    let mut pending: Vec<(PathBuf, String)> = vec![(from.to_path_buf(), String::new())];

    while let Some((dir, index_prefix)) = pending.pop() {
        if index_prefix.matches('-').count() >= MAX_NESTING_DEPTH {
            return Err(UtilError::NestedTooDeep(
                from.to_path_buf(),
                MAX_NESTING_DEPTH,
            ));
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();

        for (i, entry) in entries.iter().enumerate() {
            let index = i + 1;
            if entry.is_dir() {
                pending.push((entry.clone(), format!("{index_prefix}{index}-")));
            } else {
                let extension = entry
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{e}"))
                    .unwrap_or_default();
                let target = to.join(format!("{prefix}{index_prefix}{index}{suffix}{extension}"));
                fs::copy(entry, &target)?;
                info!(
                    "'{}' copied to '{}'.",
                    entry.display(),
                    target.display()
                );
                copied += 1;
            }
        }
    }

    Ok(copied)
}
