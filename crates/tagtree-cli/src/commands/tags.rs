//! Tags command - List, show, add, edit and delete tags

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tagtree_config::TagtreeConfig;
use tagtree_core::{Tag, TagDatabaseHandle};

use super::{
    describe_tag, open_database, print_info, print_tags, require_tag, resolve_key, sort_tags,
    OutputFormat,
};
use crate::GlobalOptions;

/// Tag management commands
#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    /// List all tags
    List(ListArgs),

    /// List the direct children of a tag
    Children(ChildrenArgs),

    /// Show one tag in detail
    Show(ShowArgs),

    /// Add a new tag
    Add(AddArgs),

    /// Edit an existing tag
    Edit(EditArgs),

    /// Delete a tag that has no children
    Delete(DeleteArgs),
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only top-level tags
    #[arg(long)]
    top_level: bool,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the children command
#[derive(Args, Debug)]
pub struct ChildrenArgs {
    /// Tag name or id
    tag: String,

    /// Output format: text (default), json
    #[arg(long, short = 'o', value_enum, default_value = "text")]
    output: OutputFormat,
}

/// Arguments for the show command
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Tag name or id
    tag: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the add command
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Name of the new tag
    name: String,

    /// Parent tag name (repeatable)
    #[arg(long = "parent", short = 'p')]
    parents: Vec<String>,

    /// Show the tag at the root of the exported hierarchy
    #[arg(long)]
    top_level: bool,

    /// Export binding (repeatable); defaults to the database's default bindings
    #[arg(long = "binding", short = 'b')]
    bindings: Vec<String>,

    /// Alternate name (repeatable)
    #[arg(long = "alias", short = 'a')]
    aliases: Vec<String>,

    /// Free-form notes
    #[arg(long)]
    notes: Option<String>,
}

/// Arguments for the edit command
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Tag name or id
    tag: String,

    /// Rename the tag
    #[arg(long)]
    name: Option<String>,

    /// Replace the parents (repeatable)
    #[arg(long = "parent", short = 'p')]
    parents: Vec<String>,

    /// Remove all parents (the tag must be top level)
    #[arg(long, conflicts_with = "parents")]
    no_parents: bool,

    /// Set whether the tag is top level
    #[arg(long)]
    top_level: Option<bool>,

    /// Replace the export bindings (repeatable)
    #[arg(long = "binding", short = 'b')]
    bindings: Vec<String>,

    /// Replace the aliases (repeatable)
    #[arg(long = "alias", short = 'a')]
    aliases: Vec<String>,

    /// Replace the notes
    #[arg(long)]
    notes: Option<String>,
}

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Tag name or id
    tag: String,
}

/// Execute a tags subcommand
pub async fn execute(cmd: TagsCommand, global: &GlobalOptions, config: &TagtreeConfig) -> Result<()> {
    let handle = open_database(config).await?;
    let result = match cmd {
        TagsCommand::List(args) => execute_list(args, &handle),
        TagsCommand::Children(args) => execute_children(args, &handle),
        TagsCommand::Show(args) => execute_show(args, &handle),
        TagsCommand::Add(args) => execute_add(args, &handle, global).await,
        TagsCommand::Edit(args) => execute_edit(args, &handle, global).await,
        TagsCommand::Delete(args) => execute_delete(args, &handle, global).await,
    };
    handle.close();
    result
}

fn execute_list(args: ListArgs, handle: &TagDatabaseHandle) -> Result<()> {
    let mut tags = handle.tags(args.top_level);
    sort_tags(&mut tags);
    print_tags(&tags, args.output)
}

fn execute_children(args: ChildrenArgs, handle: &TagDatabaseHandle) -> Result<()> {
    let parent = require_tag(handle, &args.tag)?;
    let mut children = handle.children(parent.id);
    sort_tags(&mut children);
    print_tags(&children, args.output)
}

fn execute_show(args: ShowArgs, handle: &TagDatabaseHandle) -> Result<()> {
    let tag = require_tag(handle, &args.tag)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tag)?);
        return Ok(());
    }

    let mut children: Vec<String> = handle.children(tag.id).into_iter().map(|t| t.name).collect();
    children.sort();
    let parents: Vec<&str> = tag.parent_names.iter().map(String::as_str).collect();

    println!("{} (#{})", tag.name, tag.id);
    println!("  top level: {}", if tag.is_top_level { "yes" } else { "no" });
    println!("  parents:   {}", parents.join(", "));
    println!("  children:  {}", children.join(", "));
    println!("  bindings:  {}", tag.tag_bindings.join("; "));
    println!("  aliases:   {}", tag.aliases.join("; "));
    if !tag.notes.is_empty() {
        println!("  notes:     {}", tag.notes);
    }
    if let Some(ref created) = tag.date_created {
        println!("  created:   {}", created);
    }
    if let Some(ref modified) = tag.date_modified {
        println!("  modified:  {}", modified);
    }
    Ok(())
}

async fn execute_add(args: AddArgs, handle: &TagDatabaseHandle, global: &GlobalOptions) -> Result<()> {
    let mut tag = handle.new_tag(args.name);
    tag.is_top_level = args.top_level;
    tag.parent_names = args.parents.into_iter().collect();
    if !args.bindings.is_empty() {
        tag = tag.with_bindings(args.bindings);
    }
    tag = tag.with_aliases(args.aliases);
    if let Some(notes) = args.notes {
        tag.notes = notes;
    }

    let stored = handle.write_tag(tag).await.context("Failed to add tag")?;
    print_info(&format!("Added {}", describe_tag(&stored)), global.quiet);
    Ok(())
}

async fn execute_edit(args: EditArgs, handle: &TagDatabaseHandle, global: &GlobalOptions) -> Result<()> {
    let mut tag: Tag = require_tag(handle, &args.tag)?;

    if let Some(name) = args.name {
        tag.name = name;
    }
    if args.no_parents {
        tag.parent_names.clear();
        tag.parent_ids.clear();
    } else if !args.parents.is_empty() {
        tag.parent_names = args.parents.into_iter().collect();
    }
    if let Some(top_level) = args.top_level {
        tag.is_top_level = top_level;
    }
    if !args.bindings.is_empty() {
        tag = tag.with_bindings(args.bindings);
    }
    if !args.aliases.is_empty() {
        tag = tag.with_aliases(args.aliases);
    }
    if let Some(notes) = args.notes {
        tag.notes = notes;
    }

    let stored = handle.write_tag(tag).await.context("Failed to edit tag")?;
    print_info(&format!("Updated {}", describe_tag(&stored)), global.quiet);
    Ok(())
}

async fn execute_delete(
    args: DeleteArgs,
    handle: &TagDatabaseHandle,
    global: &GlobalOptions,
) -> Result<()> {
    let key = resolve_key(handle, &args.tag);
    let deleted = handle
        .delete_tag(key)
        .await
        .context("Failed to delete tag")?;
    print_info(
        &format!("Deleted '{}' (#{})", deleted.name, deleted.id),
        global.quiet,
    );
    Ok(())
}
