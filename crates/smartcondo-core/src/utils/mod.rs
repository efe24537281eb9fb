//! Text helpers shared by the models and the terminal UI.

pub mod format;

pub use format::{contains_ignore_case, format_age, format_date, truncate_string};
