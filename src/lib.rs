//! sfkit: Salesforce DX workspace toolkit
//!
//! Permission-set and profile object/field permissions, permission set
//! lifecycle, custom labels and packaging, driven through the Salesforce CLI.
//! Local metadata files are reconciled with the org's current permission rows
//! and deployed back.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod metadata;
pub mod names;
pub mod org;
pub mod package;
pub mod permissions;
pub mod permset;
pub mod project;
pub mod refresh;
pub mod session;
pub mod workspace_status;
