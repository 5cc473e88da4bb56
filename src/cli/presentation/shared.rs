//! Shared presentation helpers.

use crate::error::SfkitError;
use serde::Serialize;

/// Pretty JSON for `--format json`.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, SfkitError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub(super) fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub(super) fn check(value: bool) -> &'static str {
    if value {
        "✓"
    } else {
        ""
    }
}
