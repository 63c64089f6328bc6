//! Owner commands

use clap::{Args, Subcommand};

use appreg_tree::NodeKind;
use serde_json::json;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// Owner commands
#[derive(Args, Debug)]
pub struct OwnersArgs {
    #[command(subcommand)]
    pub command: OwnersCommands,
}

#[derive(Subcommand, Debug)]
pub enum OwnersCommands {
    /// List the application's owners
    List(ListArgs),
    /// Add an owner by principal name or object id
    Add(AddArgs),
    /// Remove an owner
    Remove(TargetArgs),
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

    /// Owner display name, principal name, or object id
    pub owner: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: OwnersArgs) -> CliResult<()> {
    match args.command {
        OwnersCommands::List(args) => execute_list(global, args).await,
        OwnersCommands::Add(args) => execute_add(global, args).await,
        OwnersCommands::Remove(args) => execute_remove(global, args).await,
    }
}

async fn execute_list(global: &GlobalArgs, args: ListArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::OwnerGroup).await?;
    let children = cx.sync.resolve_children(&group).await?;

    if args.json {
        let entries: Vec<_> = children
            .iter()
            .filter_map(|c| c.data.as_owner())
            .map(|o| {
                json!({
                    "displayName": o.display_name,
                    "userPrincipalName": o.user_principal_name,
                    "objectId": o.id.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if children.is_empty() {
        println!("The application has no owners.");
        return Ok(());
    }

    for child in &children {
        let Some(owner) = child.data.as_owner() else {
            continue;
        };
        match &owner.user_principal_name {
            Some(upn) => println!("{}  <{upn}>", child.label),
            None => println!("{}", child.label),
        }
    }

    Ok(())
}

async fn execute_add(global: &GlobalArgs, args: AddArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::OwnerGroup).await?;

    let outcome = cx.services.owners.add(&group).await?;
    report(outcome, "Owner added.");
    Ok(())
}

async fn execute_remove(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::OwnerGroup).await?;

    let Some(owner) = cx.pick_child(&group, args.owner.as_deref(), "owner").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.owners.remove(&owner.path).await?;
    report(outcome, &format!("Owner '{}' removed.", owner.label));
    Ok(())
}
