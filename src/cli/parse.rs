//! CLI parse: clap types for sfkit. No behavior; definitions only.

use crate::permissions::{FieldFlag, ObjectFlag};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sfkit - Salesforce DX permission, label and packaging workflows
#[derive(Parser)]
#[command(name = "sfkit", version)]
#[command(about = "Permission sets, profile permissions, labels and packaging for Salesforce DX projects")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory inside the Salesforce DX project (defaults to the current directory)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Configuration file path (replaces config file discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Org alias or username (overrides config and the CLI default org)
    #[arg(long, short = 'o', global = true)]
    pub target_org: Option<String>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output includes a file)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query profiles and permission sets and overwrite the cache
    Refresh,
    /// Refresh the cache periodically until interrupted
    Watch,
    /// Show workspace, project, org and cache state
    Status,
    /// Edit object and field permissions
    Perms {
        #[command(subcommand)]
        command: PermsCommands,
    },
    /// Permission set lifecycle
    Permset {
        #[command(subcommand)]
        command: PermsetCommands,
    },
    /// Profile listing
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Custom labels
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },
    /// Second-generation packages
    Package {
        #[command(subcommand)]
        command: PackageCommands,
    },
    /// Deploy source paths to the org
    Deploy {
        /// Files or directories (defaults to the default package directory)
        paths: Vec<PathBuf>,
    },
    /// Retrieve components from the org
    Retrieve {
        /// Components as Type:Name, e.g. PermissionSet:Sales
        #[arg(required = true)]
        components: Vec<String>,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Which permission sets or profiles an edit applies to.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Permission set API name or label, or `profile:<Name>` (repeatable; prompts when omitted)
    #[arg(long = "target", short = 't')]
    pub targets: Vec<String>,

    /// Refresh cached profiles and permission sets first
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Subcommand)]
pub enum PermsCommands {
    /// Grant or revoke object permissions
    Object {
        /// Object API name, e.g. Account
        #[arg(long, conflicts_with = "path")]
        object: Option<String>,
        /// Object or field metadata file identifying the object
        #[arg(long)]
        path: Option<PathBuf>,
        #[command(flatten)]
        targets: TargetArgs,
        /// Flags to grant (prompts for a full selection when neither --grant nor --revoke is given)
        #[arg(long, value_enum, value_delimiter = ',')]
        grant: Vec<ObjectFlagArg>,
        /// Flags to revoke
        #[arg(long, value_enum, value_delimiter = ',')]
        revoke: Vec<ObjectFlagArg>,
        /// Write local files without deploying
        #[arg(long)]
        no_deploy: bool,
    },
    /// Grant or revoke field permissions
    Field {
        /// Field as Object.Field, e.g. Account.Industry
        #[arg(long, conflicts_with = "path")]
        field: Option<String>,
        /// Field metadata file
        #[arg(long)]
        path: Option<PathBuf>,
        #[command(flatten)]
        targets: TargetArgs,
        #[arg(long, value_enum, value_delimiter = ',')]
        grant: Vec<FieldFlagArg>,
        #[arg(long, value_enum, value_delimiter = ',')]
        revoke: Vec<FieldFlagArg>,
        #[arg(long)]
        no_deploy: bool,
    },
    /// Show the org's current permissions for an object or field
    Show {
        #[arg(long, conflicts_with_all = ["field", "path"])]
        object: Option<String>,
        #[arg(long, conflicts_with = "path")]
        field: Option<String>,
        #[arg(long)]
        path: Option<PathBuf>,
        #[command(flatten)]
        targets: TargetArgs,
    },
}

#[derive(Subcommand)]
pub enum PermsetCommands {
    /// List cached permission sets
    List {
        /// Refresh the cache first
        #[arg(long)]
        refresh: bool,
    },
    /// Create a permission set in the org
    Create {
        /// Label (prompted when omitted)
        #[arg(long)]
        label: Option<String>,
        /// API name (derived from the label when omitted)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Require session activation
        #[arg(long)]
        activation_required: bool,
    },
    /// Delete a permission set from the org and the workspace
    Delete {
        /// API name (prompted from the cache when omitted)
        name: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Assign a permission set to a user
    Assign {
        /// API name (prompted from the cache when omitted)
        name: Option<String>,
        /// Username to assign to (defaults to the current user)
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// List cached profiles
    List {
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand)]
pub enum LabelCommands {
    /// Add or update a custom label
    Create {
        /// Label value (prompted when omitted)
        #[arg(long)]
        value: Option<String>,
        /// Full name (derived from the value when omitted)
        #[arg(long)]
        name: Option<String>,
        /// Short description (defaults to the value)
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        protected: bool,
        /// Comma-separated categories
        #[arg(long)]
        categories: Option<String>,
        /// Deploy the labels file after writing
        #[arg(long)]
        deploy: bool,
    },
}

#[derive(Subcommand)]
pub enum PackageCommands {
    /// List packages in the Dev Hub
    List,
    /// Create a new package version
    VersionCreate {
        /// Package id or alias (prompted from `package list` when omitted)
        #[arg(long)]
        package: Option<String>,
        /// Installation key (bypassed when omitted)
        #[arg(long)]
        installation_key: Option<String>,
        /// Minutes to wait for completion
        #[arg(long)]
        wait: Option<u32>,
        #[arg(long)]
        code_coverage: bool,
        #[arg(long)]
        skip_validation: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectFlagArg {
    Read,
    Create,
    Edit,
    Delete,
    ViewAll,
    ModifyAll,
}

impl From<ObjectFlagArg> for ObjectFlag {
    fn from(arg: ObjectFlagArg) -> Self {
        match arg {
            ObjectFlagArg::Read => ObjectFlag::Read,
            ObjectFlagArg::Create => ObjectFlag::Create,
            ObjectFlagArg::Edit => ObjectFlag::Edit,
            ObjectFlagArg::Delete => ObjectFlag::Delete,
            ObjectFlagArg::ViewAll => ObjectFlag::ViewAll,
            ObjectFlagArg::ModifyAll => ObjectFlag::ModifyAll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldFlagArg {
    Read,
    Edit,
}

impl From<FieldFlagArg> for FieldFlag {
    fn from(arg: FieldFlagArg) -> Self {
        match arg {
            FieldFlagArg::Read => FieldFlag::Read,
            FieldFlagArg::Edit => FieldFlag::Edit,
        }
    }
}
