//! Developer-name derivation for metadata API names.

/// Derive a metadata API name from a free-text label.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, runs of `_` collapse to
/// one, and a leading digit gets an `x` prefix. Empty input yields an empty name.
pub fn label_to_developer_name(label: &str) -> String {
    let mut name = String::with_capacity(label.len() + 1);
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, 'x');
    }
    name
}

/// Same as [`label_to_developer_name`] for optional input.
pub fn optional_label_to_developer_name(label: Option<&str>) -> String {
    label.map(label_to_developer_name).unwrap_or_default()
}
