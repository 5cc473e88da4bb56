//! Custom label creation in the workspace's CustomLabels file.

use crate::error::SfkitError;
use crate::metadata::locate::custom_labels_path;
use crate::metadata::{CustomLabelEntry, MetadataDocument, UpsertOutcome};
use crate::names::label_to_developer_name;
use crate::org::deploy::deploy_source;
use crate::session::Session;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

const EMPTY_LABELS_FILE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<CustomLabels xmlns=\"http://soap.sforce.com/2006/04/metadata\">\n\
</CustomLabels>\n";

pub const DEFAULT_LANGUAGE: &str = "en_US";

#[derive(Debug, Clone, Default)]
pub struct LabelRequest {
    pub value: String,
    /// Full name; derived from the value when `None`.
    pub name: Option<String>,
    /// Short description; the value when `None`.
    pub description: Option<String>,
    pub language: Option<String>,
    pub protected: bool,
    pub categories: Option<String>,
    pub deploy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelWritten {
    pub name: String,
    pub file: PathBuf,
    /// `false` when an identical label already existed.
    pub changed: bool,
    pub deployed: bool,
}

/// Developer name for a label value. Salesforce rejects label names that begin or end
/// with `_`, so those are trimmed here.
fn derived_full_name(value: &str) -> String {
    let name = label_to_developer_name(value);
    let trimmed = name.trim_matches('_');
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("x{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

impl LabelRequest {
    fn entry(&self) -> Result<CustomLabelEntry, SfkitError> {
        let value = self.value.trim();
        if value.is_empty() {
            return Err(SfkitError::InvalidInput("label value is empty".to_string()));
        }
        let full_name = match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => derived_full_name(value),
        };
        if full_name.is_empty() {
            return Err(SfkitError::InvalidInput(format!(
                "cannot derive a label name from {:?}",
                value
            )));
        }
        Ok(CustomLabelEntry {
            full_name,
            value: value.to_string(),
            short_description: self
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| value.to_string()),
            language: self
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            protected: self.protected,
            categories: self.categories.clone().filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Upsert a label, creating the labels file when the project has none.
pub async fn create(session: &Session, request: &LabelRequest) -> Result<LabelWritten, SfkitError> {
    let entry = request.entry()?;
    let file = custom_labels_path(session);

    let mut document = if file.is_file() {
        MetadataDocument::load(&file)?
    } else {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(path = %file.display(), "Creating custom labels file");
        MetadataDocument::parse(EMPTY_LABELS_FILE)?
    };

    let outcome = document.upsert(&entry)?;
    let changed = outcome != UpsertOutcome::Unchanged;
    if changed || !file.exists() {
        document.save(&file)?;
    }

    let deployed = changed && request.deploy;
    if deployed {
        deploy_source(session, std::slice::from_ref(&file)).await?;
    }
    info!(label = %entry.full_name, ?outcome, deployed, "Custom label written");

    Ok(LabelWritten {
        name: entry.full_name,
        file,
        changed,
        deployed,
    })
}
