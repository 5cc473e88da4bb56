//! CLI domain: parse, route, help, output, prompts, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod progress;
mod prompt;
mod route;

pub use help::{command_name, needs_session};
pub use output::{exit_code, map_error};
pub use parse::{
    Cli, Commands, ConfigCommands, FieldFlagArg, LabelCommands, ObjectFlagArg, PackageCommands,
    PermsCommands, PermsetCommands, ProfileCommands, TargetArgs,
};
pub use route::{show_config, RunContext};
