pub mod error;
pub mod feedback;
pub mod report;
pub mod traits;

pub use error::MarkerError;
pub use feedback::{FeedbackFormat, FeedbackRecord};
pub use report::GradeReport;
pub use traits::grader::{GradeOutcome, Grader};
