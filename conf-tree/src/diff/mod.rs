//! Configuration tree diffing.

pub mod engine;
pub mod ordered;

pub use engine::{diff, diff_with_options, DiffError, DiffOptions};
