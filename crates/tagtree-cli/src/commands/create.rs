//! Create command - New database, optionally seeded from a template

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tagtree_config::TagtreeConfig;
use tagtree_core::TagDatabaseHandle;
use tracing::info;

use super::{print_info, read_template};
use crate::GlobalOptions;

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Path of the new database (must end in .thdb)
    path: PathBuf,

    /// Seed the database from a hierarchy template
    #[arg(long, short = 't')]
    template: Option<PathBuf>,

    /// Replace an existing file at the path
    #[arg(long)]
    overwrite: bool,
}

/// Execute the create command
pub async fn execute(
    args: CreateArgs,
    global: &GlobalOptions,
    config: &TagtreeConfig,
) -> Result<()> {
    let seed = match args.template {
        Some(ref template) => Some(read_template(template)?),
        None => None,
    };

    let handle = TagDatabaseHandle::new(config.store_config());
    handle
        .create(&args.path, args.overwrite, seed)
        .await
        .with_context(|| format!("Failed to create database {}", args.path.display()))?;

    let (name, count) = {
        let db = handle.lock();
        (db.name(), db.tag_count())
    };
    handle.close();

    info!(path = %args.path.display(), tags = count, "Database created");
    print_info(
        &format!("Created '{}' with {} tags", name, count),
        global.quiet,
    );
    Ok(())
}
