//! Redirect URI commands

use clap::{Args, Subcommand};

use appreg_tree::NodeKind;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// Redirect URI commands
#[derive(Args, Debug)]
pub struct UrisArgs {
    #[command(subcommand)]
    pub command: UrisCommands,
}

#[derive(Subcommand, Debug)]
pub enum UrisCommands {
    /// List the web redirect URIs
    List(ListArgs),
    /// Add a redirect URI
    Add(AddArgs),
    /// Replace a redirect URI with a corrected one
    Edit(TargetArgs),
    /// Remove a redirect URI
    Delete(TargetArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Application display name, object id, or appId
    pub app: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Application display name, object id, or appId
    pub app: String,

    /// The redirect URI (picked interactively when omitted)
    pub uri: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: UrisArgs) -> CliResult<()> {
    match args.command {
        UrisCommands::List(args) => execute_list(global, args).await,
        UrisCommands::Add(args) => execute_add(global, args).await,
        UrisCommands::Edit(args) => execute_edit(global, args).await,
        UrisCommands::Delete(args) => execute_delete(global, args).await,
    }
}

async fn execute_list(global: &GlobalArgs, args: ListArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::RedirectUriGroup).await?;
    let children = cx.sync.resolve_children(&group).await?;

    let uris: Vec<&str> = children
        .iter()
        .filter_map(|c| c.data.as_redirect_uri())
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&uris)?);
        return Ok(());
    }

    if uris.is_empty() {
        println!("No redirect URIs configured.");
        println!();
        println!("Add one with: appreg uris add '{}'", root.label);
        return Ok(());
    }

    for uri in uris {
        println!("{uri}");
    }

    Ok(())
}

async fn execute_add(global: &GlobalArgs, args: AddArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::RedirectUriGroup).await?;

    let outcome = cx.services.redirect_uris.add(&group).await?;
    report(outcome, "Redirect URI added.");
    Ok(())
}

async fn execute_edit(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::RedirectUriGroup).await?;

    let Some(uri) = cx.pick_child(&group, args.uri.as_deref(), "redirect URI").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.redirect_uris.edit(&uri.path).await?;
    report(outcome, "Redirect URI updated.");
    Ok(())
}

async fn execute_delete(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::RedirectUriGroup).await?;

    let Some(uri) = cx.pick_child(&group, args.uri.as_deref(), "redirect URI").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.redirect_uris.delete(&uri.path).await?;
    report(outcome, &format!("Redirect URI '{}' removed.", uri.label));
    Ok(())
}
