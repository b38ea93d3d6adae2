//! Keyed points/comment store over a Moodle-style grading worksheet.
//!
//! The sheet is a CSV export with one row per participant. This crate only
//! exposes the narrow get/set-by-id contract the grading session needs;
//! everything else about the worksheet (extra columns, row order) is carried
//! through untouched and written back with full quoting, the way the
//! platform expects it on re-upload.

mod error;
mod sheet;

pub use error::GradebookError;
pub use sheet::GradingSheet;
