//! File sources for layered configuration.

pub mod global_file;
pub mod workspace_file;
