//! CLI help and command-name contract for logging and routing.

use crate::cli::parse::{
    Commands, ConfigCommands, LabelCommands, PackageCommands, PermsCommands, PermsetCommands,
    ProfileCommands,
};

/// Command name string for log spans (e.g. "perms.object", "permset.create").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Refresh => "refresh".to_string(),
        Commands::Watch => "watch".to_string(),
        Commands::Status => "status".to_string(),
        Commands::Perms { command } => format!("perms.{}", perms_command_name(command)),
        Commands::Permset { command } => format!("permset.{}", permset_command_name(command)),
        Commands::Profile { command } => match command {
            ProfileCommands::List { .. } => "profile.list".to_string(),
        },
        Commands::Label { command } => match command {
            LabelCommands::Create { .. } => "label.create".to_string(),
        },
        Commands::Package { command } => format!("package.{}", package_command_name(command)),
        Commands::Deploy { .. } => "deploy".to_string(),
        Commands::Retrieve { .. } => "retrieve".to_string(),
        Commands::Config { command } => match command {
            ConfigCommands::Show => "config.show".to_string(),
        },
    }
}

pub fn perms_command_name(command: &PermsCommands) -> &'static str {
    match command {
        PermsCommands::Object { .. } => "object",
        PermsCommands::Field { .. } => "field",
        PermsCommands::Show { .. } => "show",
    }
}

pub fn permset_command_name(command: &PermsetCommands) -> &'static str {
    match command {
        PermsetCommands::List { .. } => "list",
        PermsetCommands::Create { .. } => "create",
        PermsetCommands::Delete { .. } => "delete",
        PermsetCommands::Assign { .. } => "assign",
    }
}

pub fn package_command_name(command: &PackageCommands) -> &'static str {
    match command {
        PackageCommands::List => "list",
        PackageCommands::VersionCreate { .. } => "version_create",
    }
}

/// Commands that run without a Salesforce DX project.
pub fn needs_session(command: &Commands) -> bool {
    !matches!(command, Commands::Config { .. })
}
