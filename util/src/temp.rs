//! Session-scoped tracking of temporary folders.
//!
//! Extraction and grading scratch space is created all over the working
//! directory; every such folder is pushed onto a LIFO stack and removed in
//! reverse order, so nested temporaries disappear before their parents.
//! The stack is owned by the session (no process-wide globals) and is also
//! drained from the binary's interrupt handler.

use crate::error::UtilError;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct TempStack {
    stack: Vec<PathBuf>,
    counter: usize,
}

impl TempStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh uniquely-named scratch folder under `base` and track it.
    pub fn create_dir(&mut self, base: &Path) -> Result<PathBuf, UtilError> {
        let dir = base.join(format!("__PEX_TMP_{}__", self.counter));
        self.counter += 1;
        fs::create_dir_all(&dir)?;
        info!("folder '{}' created.", dir.display());
        self.register(dir.clone());
        Ok(dir)
    }

    /// Track an already-created folder for removal on teardown.
    pub fn register(&mut self, path: PathBuf) {
        self.stack.push(path);
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Remove all tracked folders, most recent first.
    pub fn drain(&mut self) {
        while let Some(folder) = self.stack.pop() {
            if !folder.exists() {
                continue;
            }
            match fs::remove_dir_all(&folder) {
                Ok(()) => info!("'{}' deleted.", folder.display()),
                Err(e) => warn!("could not delete '{}': {e}.", folder.display()),
            }
        }
    }
}

impl Drop for TempStack {
    fn drop(&mut self) {
        self.drain();
    }
}
