//! Fuzzy file/folder lookup under an unpredictable directory tree.
//!
//! Downloaded submission trees have no reliable structure, so lookups match
//! entry names against a glob pattern anywhere below a root. Non-ASCII
//! characters in the pattern are widened to `*` first: downloads regularly
//! mangle umlauts and accents, and a lookup must still hit the folder.

use crate::error::UtilError;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

/// Picks one candidate out of several equally-matching paths.
///
/// The locator is agnostic to whether the implementation asks a human or is
/// scripted; it only guarantees that the candidate list is stably ordered,
/// so repeated runs offer the same choices.
pub trait Chooser {
    fn choose(&mut self, keyword: &str, candidates: &[PathBuf]) -> Result<usize, UtilError>;
}

fn widen_non_ascii(pattern: &str) -> String {
    pattern
        .chars()
        .map(|c| if c.is_ascii() { c } else { '*' })
        .collect()
}

/// All files and folders under `root` whose name matches `pattern`,
/// in lexicographic path order.
pub fn find_all(pattern: &str, root: &Path) -> Result<Vec<PathBuf>, UtilError> {
    let widened = widen_non_ascii(pattern);
    let matcher =
        Pattern::new(&widened).map_err(|_| UtilError::BadPattern(widened.clone()))?;

    let mut matches = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if matcher.matches(name) {
                    matches.push(path.clone());
                }
            }
            if path.is_dir() {
                pending.push(path);
            }
        }
    }

    matches.sort();
    Ok(matches)
}

/// Resolve `pattern` to exactly one path.
///
/// Zero matches is an error the caller treats as fatal or skippable
/// depending on its unit of work; multiple matches are disambiguated
/// through the supplied [`Chooser`].
pub fn find_single(
    pattern: &str,
    root: &Path,
    filter: Option<&dyn Fn(&Path) -> bool>,
    chooser: &mut dyn Chooser,
) -> Result<PathBuf, UtilError> {
    let mut results = find_all(pattern, root)?;
    if let Some(filter) = filter {
        results.retain(|p| filter(p));
    }

    match results.len() {
        0 => Err(UtilError::NotFound(pattern.to_string())),
        1 => Ok(results.remove(0)),
        _ => {
            let index = chooser.choose(pattern, &results)?;
            results
                .get(index)
                .cloned()
                .ok_or_else(|| {
                    UtilError::ChooserFailed(
                        pattern.to_string(),
                        format!("index {index} out of range"),
                    )
                })
        }
    }
}

/// Chooser that always takes the first candidate. Useful for scripted runs
/// and tests; interactive sessions use the terminal prompter instead.
pub struct FirstMatch;

impl Chooser for FirstMatch {
    fn choose(&mut self, _keyword: &str, _candidates: &[PathBuf]) -> Result<usize, UtilError> {
        Ok(0)
    }
}
