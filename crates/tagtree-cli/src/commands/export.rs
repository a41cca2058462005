//! Export command - Write the hierarchy out as a template

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tagtree_config::TagtreeConfig;

use super::{open_database, print_info};
use crate::GlobalOptions;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

/// Execute the export command
pub async fn execute(
    args: ExportArgs,
    global: &GlobalOptions,
    config: &TagtreeConfig,
) -> Result<()> {
    let handle = open_database(config).await?;
    let template = handle.export_template();
    handle.close();

    match args.output {
        Some(path) => {
            std::fs::write(&path, &template)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_info(&format!("Exported to {}", path.display()), global.quiet);
        }
        None => print!("{}", template),
    }
    Ok(())
}
