//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ErrorCategory, SfkitError};
use owo_colors::OwoColorize;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &SfkitError) -> String {
    let prefix = match e.category() {
        ErrorCategory::Environment => "setup",
        ErrorCategory::Org => "org",
        ErrorCategory::Metadata => "metadata",
        ErrorCategory::Input => "input",
        ErrorCategory::Internal => "internal",
    };
    format!("{} {}", format!("error[{}]:", prefix).red().bold(), e)
}

/// Process exit code for an error category.
pub fn exit_code(e: &SfkitError) -> i32 {
    match e.category() {
        ErrorCategory::Input => 2,
        ErrorCategory::Environment => 3,
        _ => 1,
    }
}
