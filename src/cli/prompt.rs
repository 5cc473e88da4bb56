//! Interactive fallbacks for arguments left off the command line.

use crate::error::SfkitError;
use crate::permissions::{
    FieldFlag, FieldPermissionFlags, ObjectFlag, ObjectPermissionFlags, PermissionTarget,
};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use std::io::IsTerminal;

/// Fail with a hint instead of blocking when stdin is not a terminal.
fn ensure_interactive(missing: &str) -> Result<(), SfkitError> {
    if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
        Ok(())
    } else {
        Err(SfkitError::InvalidInput(format!(
            "{} is required when not running interactively",
            missing
        )))
    }
}

pub fn text(prompt: &str, missing: &str) -> Result<String, SfkitError> {
    ensure_interactive(missing)?;
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?;
    Ok(value.trim().to_string())
}

/// Text with a pre-filled default the user can accept.
pub fn text_with_default(prompt: &str, default: &str) -> Result<String, SfkitError> {
    ensure_interactive(prompt)?;
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(value.trim().to_string())
}

pub fn confirm(prompt: &str) -> Result<bool, SfkitError> {
    ensure_interactive("--yes")?;
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Pick one item by its display string.
pub fn select_one(prompt: &str, items: &[String], missing: &str) -> Result<usize, SfkitError> {
    if items.is_empty() {
        return Err(SfkitError::InvalidInput(format!("nothing to choose for {}", missing)));
    }
    ensure_interactive(missing)?;
    Ok(Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()?)
}

/// Multi-select permission sets and profiles. An empty selection is an error.
pub fn select_targets(candidates: &[PermissionTarget]) -> Result<Vec<PermissionTarget>, SfkitError> {
    if candidates.is_empty() {
        return Err(SfkitError::InvalidInput(
            "no cached permission sets or profiles; run `sfkit refresh` first".to_string(),
        ));
    }
    ensure_interactive("--target")?;
    let items: Vec<String> = candidates.iter().map(PermissionTarget::display_name).collect();
    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Permission sets and profiles (space to toggle)")
        .items(&items)
        .interact()?;
    if picked.is_empty() {
        return Err(SfkitError::InvalidInput("no targets selected".to_string()));
    }
    Ok(picked.into_iter().map(|i| candidates[i].clone()).collect())
}

/// Pick object flags. Flags every target holds start checked; flags only some
/// targets hold are marked and start unchecked.
pub fn select_object_flags(
    common: ObjectPermissionFlags,
    any: ObjectPermissionFlags,
) -> Result<Vec<ObjectFlag>, SfkitError> {
    ensure_interactive("--grant/--revoke")?;
    let items: Vec<String> = ObjectFlag::ALL
        .iter()
        .map(|f| flag_item(f.label(), common.get(*f), any.get(*f)))
        .collect();
    let defaults: Vec<bool> = ObjectFlag::ALL.iter().map(|f| common.get(*f)).collect();
    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Object permissions")
        .items(&items)
        .defaults(&defaults)
        .interact()?;
    Ok(picked.into_iter().map(|i| ObjectFlag::ALL[i]).collect())
}

pub fn select_field_flags(
    common: FieldPermissionFlags,
    any: FieldPermissionFlags,
) -> Result<Vec<FieldFlag>, SfkitError> {
    ensure_interactive("--grant/--revoke")?;
    let items: Vec<String> = FieldFlag::ALL
        .iter()
        .map(|f| flag_item(f.label(), common.get(*f), any.get(*f)))
        .collect();
    let defaults: Vec<bool> = FieldFlag::ALL.iter().map(|f| common.get(*f)).collect();
    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Field permissions")
        .items(&items)
        .defaults(&defaults)
        .interact()?;
    Ok(picked.into_iter().map(|i| FieldFlag::ALL[i]).collect())
}

fn flag_item(label: &str, on_all: bool, on_some: bool) -> String {
    if on_some && !on_all {
        format!("{} (some targets, kept unless checked)", label)
    } else {
        label.to_string()
    }
}
