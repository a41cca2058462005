//! Import command - Merge a hierarchy template into an existing database

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tagtree_config::TagtreeConfig;

use super::{open_database, print_info, read_template};
use crate::GlobalOptions;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Hierarchy template to import
    template: PathBuf,
}

/// Execute the import command
pub async fn execute(
    args: ImportArgs,
    global: &GlobalOptions,
    config: &TagtreeConfig,
) -> Result<()> {
    let hierarchy = read_template(&args.template)?;
    let handle = open_database(config).await?;

    let result = handle
        .import(hierarchy)
        .await
        .context("Import failed; the database was left unchanged")?;
    handle.close();

    print_info(
        &format!("Imported {} new tags", result.added.len()),
        global.quiet,
    );
    Ok(())
}
