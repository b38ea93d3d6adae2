//! Open a file in the platform's default viewer/editor.

use crate::error::RunnerError;
use log::info;
use std::path::Path;
use std::process::Command;

pub fn open_path(path: &Path) -> Result<(), RunnerError> {
    info!("opening '{}'.", path.display());

    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(path);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(path);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(path);
        c
    };

    command.spawn()?;
    Ok(())
}
