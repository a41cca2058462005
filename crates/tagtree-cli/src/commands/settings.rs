//! Settings command - View and edit the database's key/value settings
//!
//! `default_tag_bind` holds the bindings given to new tags, as a
//! semicolon-separated list.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tagtree_config::TagtreeConfig;

use super::{open_database, print_info};
use crate::GlobalOptions;

/// Settings management commands
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// List all settings
    List(ListArgs),

    /// Get one setting
    Get(KeyArgs),

    /// Update an existing setting
    Set(KeyValueArgs),

    /// Create a new setting
    Create(KeyValueArgs),

    /// Delete a setting (required settings cannot be deleted)
    Delete(KeyArgs),

    /// Restore default tag bindings from the configuration
    Reset,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Setting key
    key: String,
}

#[derive(Args, Debug)]
pub struct KeyValueArgs {
    /// Setting key
    key: String,

    /// Setting value
    value: String,
}

/// Execute a settings subcommand
pub async fn execute(
    cmd: SettingsCommand,
    global: &GlobalOptions,
    config: &TagtreeConfig,
) -> Result<()> {
    let handle = open_database(config).await?;

    match cmd {
        SettingsCommand::List(args) => {
            let settings = handle
                .run(|db| db.settings().get_all())
                .await
                .context("Failed to read settings")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                for (key, value) in &settings {
                    println!("{} = {}", key, value);
                }
            }
        }
        SettingsCommand::Get(args) => {
            let value = handle
                .get_setting(args.key.as_str())
                .await
                .with_context(|| format!("Failed to read setting '{}'", args.key))?;
            println!("{}", value);
        }
        SettingsCommand::Set(args) => {
            handle
                .update_setting(args.key.as_str(), args.value.as_str())
                .await
                .with_context(|| format!("Failed to update setting '{}'", args.key))?;
            print_info(&format!("Set {} = {}", args.key, args.value), global.quiet);
        }
        SettingsCommand::Create(args) => {
            let (key, value) = (args.key.clone(), args.value.clone());
            handle
                .run(move |db| db.settings().create(&key, &value))
                .await
                .with_context(|| format!("Failed to create setting '{}'", args.key))?;
            print_info(&format!("Created {} = {}", args.key, args.value), global.quiet);
        }
        SettingsCommand::Delete(args) => {
            let key = args.key.clone();
            handle
                .run(move |db| db.settings().delete(&key))
                .await
                .with_context(|| format!("Failed to delete setting '{}'", args.key))?;
            print_info(&format!("Deleted {}", args.key), global.quiet);
        }
        SettingsCommand::Reset => {
            handle
                .run(|db| db.settings().reset_defaults())
                .await
                .context("Failed to reset settings")?;
            print_info("Settings reset to defaults", global.quiet);
        }
    }

    handle.close();
    Ok(())
}
