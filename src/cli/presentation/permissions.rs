//! Permission presentation: edit reports and `perms show` tables.

use super::shared::check;
use crate::permissions::{
    EditReport, FieldFlag, ObjectFlag, PermissionView, TargetStatus,
};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_edit_report_text(report: &EditReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Target", "Result", "Flags", "File"]);
    for outcome in &report.outcomes {
        let flags = match (&outcome.object_flags, &outcome.field_flags) {
            (Some(flags), _) => flags
                .granted()
                .iter()
                .map(|f| f.label())
                .collect::<Vec<_>>()
                .join(", "),
            (None, Some(flags)) => flags
                .granted()
                .iter()
                .map(|f| f.label())
                .collect::<Vec<_>>()
                .join(", "),
            (None, None) => String::new(),
        };
        let flags = if flags.is_empty() && !outcome.failed() {
            "none".to_string()
        } else {
            flags
        };
        let (result, file) = match &outcome.status {
            TargetStatus::Updated { file, deployed } => {
                let mut result = if *deployed { "deployed" } else { "written" }.to_string();
                if outcome.injected_object_read {
                    result.push_str(" (+object read)");
                }
                (result.green().to_string(), file.display().to_string())
            }
            TargetStatus::Unchanged { file } => {
                ("unchanged".dimmed().to_string(), file.display().to_string())
            }
            TargetStatus::Failed { error } => (format!("{}", "failed".red()), error.clone()),
        };
        table.add_row(vec![outcome.target.display_name(), result, flags, file]);
    }

    let failed = report.failed_count();
    let summary = if failed == 0 {
        format!("{}: {} target(s) processed", report.subject, report.outcomes.len())
    } else {
        format!(
            "{}: {} of {} target(s) failed",
            report.subject,
            failed,
            report.outcomes.len()
        )
    };
    format!("{}\n{}", table, summary)
}

/// Object or field flags per target; `field` selects the column set.
pub fn format_permission_views_text(subject: &str, views: &[PermissionView], field: bool) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    let mut header = vec!["Target".to_string()];
    if field {
        header.extend(FieldFlag::ALL.iter().map(|f| f.label().to_string()));
    } else {
        header.extend(ObjectFlag::ALL.iter().map(|f| f.label().to_string()));
    }
    table.set_header(header);

    for view in views {
        let mut row = vec![view.target.display_name()];
        if field {
            let flags = view.field.unwrap_or_default();
            row.extend(FieldFlag::ALL.iter().map(|f| check(flags.get(*f)).to_string()));
        } else {
            let flags = view.object.unwrap_or_default();
            row.extend(ObjectFlag::ALL.iter().map(|f| check(flags.get(*f)).to_string()));
        }
        table.add_row(row);
    }
    format!("{}\n{}", subject.bold(), table)
}
