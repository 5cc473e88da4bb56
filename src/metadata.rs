//! Local metadata source files.
//!
//! Path recognition, workspace search and retrieve fallback, and keyed upsert of
//! permission and label blocks.

pub mod document;
pub mod locate;
pub mod path;

pub use document::{
    CustomLabelEntry, FieldPermissionEntry, MetadataDocument, MetadataEntry, ObjectPermissionEntry,
    UpsertOutcome,
};
pub use path::{parse_metadata_path, MetadataRef};
