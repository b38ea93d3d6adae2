//! Roster parsing: one group per line, members comma-separated.

use crate::error::UtilError;
use std::fs;
use std::path::Path;

/// A fixed ordered list of member names graded as a unit. The order defines
/// each member's letter suffix in the submission filename convention.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub members: Vec<String>,
}

/// Parse a roster file. Whitespace around member names is stripped; blank
/// lines and empty names (stray commas) are dropped. An empty name would
/// otherwise turn into a match-everything lookup pattern downstream.
pub fn parse_roster(path: &Path) -> Result<Vec<Group>, UtilError> {
    let content = fs::read_to_string(path)
        .map_err(|_| UtilError::PathMissing(path.to_path_buf()))?;

    let groups = content
        .lines()
        .map(|line| Group {
            members: line
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
        .filter(|group| !group.members.is_empty())
        .collect();

    Ok(groups)
}
