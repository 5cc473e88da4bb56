//! Recognize object and field source files by path.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

const OBJECT_SUFFIX: &str = ".object-meta.xml";
const FIELD_SUFFIX: &str = ".field-meta.xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetadataRef {
    Object {
        object_api_name: String,
    },
    Field {
        object_api_name: String,
        field_api_name: String,
        field_full_name: String,
    },
}

impl MetadataRef {
    pub fn object_api_name(&self) -> &str {
        match self {
            MetadataRef::Object { object_api_name } | MetadataRef::Field { object_api_name, .. } => {
                object_api_name
            }
        }
    }

    /// Build a field reference from `Object.Field`.
    pub fn field_from_full_name(full_name: &str) -> Option<Self> {
        let (object, field) = full_name.split_once('.')?;
        if object.is_empty() || field.is_empty() || field.contains('.') {
            return None;
        }
        Some(MetadataRef::Field {
            object_api_name: object.to_string(),
            field_api_name: field.to_string(),
            field_full_name: full_name.to_string(),
        })
    }
}

/// Parse a source-format path.
///
/// - `.../objects/Account/Account.object-meta.xml` is the `Account` object.
/// - `.../objects/X/fields/Y.field-meta.xml` is field `X.Y`.
///
/// Anything else is `None`.
pub fn parse_metadata_path(path: &Path) -> Option<MetadataRef> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .flat_map(|part| {
            // Tolerate Windows separators in paths handed over as plain strings.
            part.split('\\').map(str::to_string).collect::<Vec<_>>()
        })
        .filter(|p| !p.is_empty())
        .collect();

    let n = parts.len();
    let file = parts.last()?;

    if let Some(object) = file.strip_suffix(OBJECT_SUFFIX) {
        if n >= 3 && parts[n - 2] == object && parts[n - 3] == "objects" && !object.is_empty() {
            return Some(MetadataRef::Object {
                object_api_name: object.to_string(),
            });
        }
        return None;
    }

    if let Some(field) = file.strip_suffix(FIELD_SUFFIX) {
        if n >= 4 && parts[n - 2] == "fields" && parts[n - 4] == "objects" && !field.is_empty() {
            let object = &parts[n - 3];
            return Some(MetadataRef::Field {
                object_api_name: object.clone(),
                field_api_name: field.to_string(),
                field_full_name: format!("{}.{}", object, field),
            });
        }
    }

    None
}
