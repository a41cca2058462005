//! Search command - Name and alias search

use anyhow::Result;
use clap::Args;
use tagtree_config::TagtreeConfig;
use tagtree_core::SearchMode;

use super::{open_database, print_tags, sort_tags, OutputFormat};
use crate::GlobalOptions;

/// Arguments for the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query (case and diacritics are ignored)
    query: String,

    /// Match mode: fuzzy, starts-with, ends-with or exact
    #[arg(long, short = 'm', value_parser = parse_search_mode)]
    mode: Option<SearchMode>,

    /// Also match aliases
    #[arg(long, conflicts_with = "no_aliases")]
    aliases: bool,

    /// Match names only
    #[arg(long)]
    no_aliases: bool,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

fn parse_search_mode(s: &str) -> Result<SearchMode, String> {
    s.parse()
}

impl SearchArgs {
    fn include_aliases(&self, config: &TagtreeConfig) -> bool {
        if self.aliases {
            true
        } else if self.no_aliases {
            false
        } else {
            config.search.include_aliases
        }
    }
}

/// Execute the search command
pub async fn execute(args: SearchArgs, global: &GlobalOptions, config: &TagtreeConfig) -> Result<()> {
    let handle = open_database(config).await?;
    let mode = args.mode.unwrap_or(config.search.mode);

    let mut results = handle.search(&args.query, mode, args.include_aliases(config));
    handle.close();

    if results.is_empty() {
        if !global.quiet {
            eprintln!("No results found for: {}", args.query);
        }
        return Ok(());
    }

    sort_tags(&mut results);
    if matches!(args.output, OutputFormat::Text) && !global.quiet {
        eprintln!("Found {} tags matching \"{}\" ({}):", results.len(), args.query, mode);
    }
    print_tags(&results, args.output)
}
