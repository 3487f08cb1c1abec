//! Utility functions.

pub mod fillings;

pub use fillings::{apply_welcome_fillings, html_escape, mention};
