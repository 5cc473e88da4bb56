//! CLI presentation: text and json formatters per command family.

mod org;
mod permissions;
mod shared;

pub use org::{
    format_assignment, format_created, format_deleted, format_label_written,
    format_operation_report, format_packages_text, format_permission_sets_text,
    format_profiles_text, format_refresh_summary, format_version_result,
};
pub use permissions::{format_edit_report_text, format_permission_views_text};
pub use shared::to_json;
