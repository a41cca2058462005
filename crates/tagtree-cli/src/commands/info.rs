//! Info command - Database metadata and counts

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tagtree_config::TagtreeConfig;

use super::open_database;
use crate::GlobalOptions;

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Summary of an open database
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub path: Option<PathBuf>,
    pub version: i64,
    pub tag_count: usize,
    pub top_level_count: usize,
    pub relationship_count: usize,
    pub default_tag_bindings: Vec<String>,
}

/// Execute the info command
pub async fn execute(args: InfoArgs, _global: &GlobalOptions, config: &TagtreeConfig) -> Result<()> {
    let handle = open_database(config).await?;
    let info = {
        let db = handle.lock();
        DatabaseInfo {
            name: db.name(),
            path: db.path().map(PathBuf::from),
            version: db.version(),
            tag_count: db.tag_count(),
            top_level_count: db.all_tags(true).len(),
            relationship_count: db.relationship_count(),
            default_tag_bindings: db.default_tag_bindings().to_vec(),
        }
    };
    handle.close();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Database:       {}", info.name);
    if let Some(ref path) = info.path {
        println!("Path:           {}", path.display());
    }
    println!("Version:        {}", info.version);
    println!(
        "Tags:           {} ({} top level)",
        info.tag_count, info.top_level_count
    );
    println!("Relationships:  {}", info.relationship_count);
    println!("Default bind:   {}", info.default_tag_bindings.join("; "));
    Ok(())
}
