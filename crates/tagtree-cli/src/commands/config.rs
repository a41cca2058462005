//! Config command - View and manage configuration
//!
//! - Show the effective configuration
//! - Create a default config file (local or global)
//! - Show configuration file paths

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tagtree_config::{ConfigLoader, TagtreeConfig};

use super::print_info;
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Write a default config file
    Init(InitArgs),

    /// Show configuration file paths
    Path(PathArgs),
}

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON instead of TOML
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Create ~/.tagtree/config.toml instead of ./.tagtree/config.toml
    #[arg(long)]
    global: bool,
}

/// Arguments for the path command
#[derive(Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
    /// File given with --config, if any
    pub explicit: Option<PathBuf>,
}

/// Execute the config command
pub async fn execute(
    cmd: ConfigCommand,
    global: &GlobalOptions,
    config: &TagtreeConfig,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, config),
        ConfigCommand::Init(args) => execute_init(args, global),
        ConfigCommand::Path(args) => execute_path(args, global),
    }
}

fn execute_show(args: ShowArgs, config: &TagtreeConfig) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!(
            "{}",
            toml::to_string_pretty(config).context("Failed to serialize configuration")?
        );
    }
    Ok(())
}

fn execute_init(args: InitArgs, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if args.global {
        loader.init_global()?
    } else {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        loader.init_local(&cwd)?
    };

    print_info(&format!("Config file: {}", path.display()), global.quiet);
    Ok(())
}

fn execute_path(args: PathArgs, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let global_path = loader.global_config_path();
    let local_path = loader.local_config_path(&cwd);
    let paths = ConfigPaths {
        global_exists: global_path.as_ref().is_some_and(|p| p.exists()),
        local_exists: local_path.exists(),
        global: global_path,
        local: local_path,
        explicit: global.config.clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    let marker = |exists: bool| if exists { "" } else { " (not found)" };
    match paths.global {
        Some(ref path) => println!("Global: {}{}", path.display(), marker(paths.global_exists)),
        None => println!("Global: (no home directory)"),
    }
    println!("Local:  {}{}", paths.local.display(), marker(paths.local_exists));
    if let Some(ref path) = paths.explicit {
        println!("Active: {}", path.display());
    }
    Ok(())
}
