//! sfkit CLI Binary
//!
//! Command-line interface for Salesforce DX permission, label and packaging workflows.

use clap::Parser;
use sfkit::cli::{exit_code, map_error, needs_session, show_config, Cli, RunContext};
use sfkit::config::{paths, ConfigLoader};
use sfkit::logging::{init_logging, LoggingConfig};
use sfkit::project::find_workspace_root;
use sfkit::session::SessionOptions;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("sfkit starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    if !needs_session(&cli.command) {
        match show_config(cli.workspace.as_deref(), cli.config.as_deref()) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}", map_error(&e));
                process::exit(exit_code(&e));
            }
        }
        return;
    }

    let options = SessionOptions {
        workspace: cli.workspace.clone(),
        config_file: cli.config.clone(),
        target_org: cli.target_org.clone(),
        ..Default::default()
    };
    let context = match RunContext::new(options, cli.format.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error opening workspace: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    };

    match runtime.block_on(context.execute(&cli.command)) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    }
}

/// Logging settings: config files, then `SFKIT_LOG*` variables, then flags.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let start = cli
        .workspace
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let root = find_workspace_root(&start).unwrap_or(start);
    let mut config = ConfigLoader::load_with_override(&root, cli.config.as_deref())
        .ok()
        .map(|c| c.logging)
        .unwrap_or_default()
        .with_env_overrides();

    if config.file == LoggingConfig::default().file {
        if let Ok(dir) = paths::data_dir() {
            config.file = dir.join("sfkit.log");
        }
    }

    if cli.quiet {
        config.level = "off".to_string();
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
