//! Terminal output: live progress and the end-of-run summary.

pub mod progress;
pub mod summary;

pub use progress::{ProgressRenderer, status_line};
pub use summary::{format_summary, print_summary};
