//! Org interaction: CLI invocation, SOQL templates, REST, and deploy/retrieve.

pub mod cli;
pub mod deploy;
pub mod records;
pub mod rest;
pub mod soql;

pub use cli::{run_json, CliOutcome, CliOutput, ProcessCli, SfCli};
pub use records::{OrgUser, PermissionSet, Profile};
pub use rest::{OrgConnection, RestClient};
