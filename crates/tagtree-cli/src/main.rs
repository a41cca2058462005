//! Tagtree CLI - Tag hierarchy editing, search and template export
//!
//! A command-line interface over a tag hierarchy database: create one from a
//! hierarchy template, edit tags, search them, and export the template again.
//!
//! # Usage
//!
//! ```bash
//! # Create a database seeded from a MusicBee template
//! tagtree create genres.thdb --template TagHierarchy.txt
//!
//! # Search names and aliases
//! tagtree --db genres.thdb search "ambient"
//!
//! # Add a tag under two parents
//! tagtree --db genres.thdb tags add "Space Ambient" -p Ambient -p Electronic
//!
//! # Export the template back out
//! tagtree --db genres.thdb export --output TagHierarchy.txt
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tagtree_config::{ConfigOverrides, LogFormat};
use tagtree_core::JournalMode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Tagtree - Multi-parent tag hierarchies with template import/export
#[derive(Parser, Debug)]
#[command(name = "tagtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Tag hierarchy database (.thdb) to operate on
    #[arg(long, short = 'd', global = true, env = "TAGTREE_DATABASE")]
    db: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "TAGTREE_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite journal mode: delete, wal or memory
    #[arg(long, global = true, value_parser = parse_journal_mode)]
    journal_mode: Option<JournalMode>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };

        ConfigOverrides {
            database: self.db.clone(),
            journal_mode: self.journal_mode,
            log_level,
        }
    }
}

fn parse_journal_mode(s: &str) -> Result<JournalMode, String> {
    s.parse()
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new database, optionally seeded from a template
    Create(commands::create::CreateArgs),

    /// Import a hierarchy template into an existing database
    Import(commands::import::ImportArgs),

    /// Export the hierarchy as a template
    Export(commands::export::ExportArgs),

    /// Show database details
    Info(commands::info::InfoArgs),

    /// Search tags by name or alias
    Search(commands::search::SearchArgs),

    /// List, show and edit tags
    #[command(subcommand)]
    Tags(commands::tags::TagsCommand),

    /// View and edit database settings
    #[command(subcommand)]
    Settings(commands::settings::SettingsCommand),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn init_logging(level: Level, format: LogFormat) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli.global)?;

    let level = Level::from_str(&config.logging.level).unwrap_or(Level::WARN);
    init_logging(level, config.logging.format)?;

    match cli.command {
        Commands::Create(args) => commands::create::execute(args, &cli.global, &config).await,
        Commands::Import(args) => commands::import::execute(args, &cli.global, &config).await,
        Commands::Export(args) => commands::export::execute(args, &cli.global, &config).await,
        Commands::Info(args) => commands::info::execute(args, &cli.global, &config).await,
        Commands::Search(args) => commands::search::execute(args, &cli.global, &config).await,
        Commands::Tags(cmd) => commands::tags::execute(cmd, &cli.global, &config).await,
        Commands::Settings(cmd) => commands::settings::execute(cmd, &cli.global, &config).await,
        Commands::Config(cmd) => commands::config::execute(cmd, &cli.global, &config).await,
    }
}
