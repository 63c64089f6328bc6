//! Permission scope commands

use clap::{Args, Subcommand};

use appreg_core::model::PermissionScope;
use appreg_tree::NodeKind;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::output::truncate;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// Permission scope commands
#[derive(Args, Debug)]
pub struct ScopesArgs {
    #[command(subcommand)]
    pub command: ScopesCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScopesCommands {
    /// List the delegated permission scopes an application exposes
    List(ListArgs),
    /// Expose a new permission scope
    Add(AddArgs),
    /// Edit a permission scope's declaration
    Edit(TargetArgs),
    /// Enable a permission scope
    Enable(TargetArgs),
    /// Disable a permission scope
    Disable(TargetArgs),
    /// Delete a permission scope
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

    /// Scope value or id (picked interactively when omitted)
    pub scope: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: ScopesArgs) -> CliResult<()> {
    match args.command {
        ScopesCommands::List(args) => execute_list(global, args).await,
        ScopesCommands::Add(args) => execute_add(global, args).await,
        ScopesCommands::Edit(args) => execute_edit(global, args).await,
        ScopesCommands::Enable(args) => execute_set_enabled(global, args, true).await,
        ScopesCommands::Disable(args) => execute_set_enabled(global, args, false).await,
        ScopesCommands::Delete(args) => execute_delete(global, args).await,
    }
}

async fn execute_list(global: &GlobalArgs, args: ListArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::ScopeGroup).await?;
    let children = cx.sync.resolve_children(&group).await?;

    let scopes: Vec<&PermissionScope> =
        children.iter().filter_map(|c| c.data.as_scope()).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scopes)?);
        return Ok(());
    }

    if scopes.is_empty() {
        println!("No permission scopes exposed.");
        println!();
        println!("Expose one with: appreg scopes add '{}'", root.label);
        return Ok(());
    }

    println!(
        "{:<28} {:<26} {:<9} {:<36}",
        "VALUE", "CONSENT", "ENABLED", "ID"
    );
    println!("{}", "-".repeat(100));
    for scope in &scopes {
        println!(
            "{:<28} {:<26} {:<9} {:<36}",
            truncate(&scope.label(), 26),
            scope.consent.describe(),
            if scope.is_enabled { "yes" } else { "no" },
            scope.id
        );
    }

    Ok(())
}

async fn execute_add(global: &GlobalArgs, args: AddArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::ScopeGroup).await?;

    let outcome = cx.services.scopes.add(&group).await?;
    report(outcome, "Permission scope added.");
    Ok(())
}

async fn execute_edit(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::ScopeGroup).await?;

    let Some(scope) = cx.pick_child(&group, args.scope.as_deref(), "scope").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.scopes.edit(&scope.path).await?;
    report(outcome, &format!("Scope '{}' updated.", scope.label));
    Ok(())
}

async fn execute_set_enabled(
    global: &GlobalArgs,
    args: TargetArgs,
    enabled: bool,
) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::ScopeGroup).await?;

    let Some(scope) = cx.pick_child(&group, args.scope.as_deref(), "scope").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.scopes.set_enabled(&scope.path, enabled).await?;
    let state = if enabled { "enabled" } else { "disabled" };
    report(outcome, &format!("Scope '{}' {state}.", scope.label));
    Ok(())
}

async fn execute_delete(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::ScopeGroup).await?;

    let Some(scope) = cx.pick_child(&group, args.scope.as_deref(), "scope").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.scopes.delete(&scope.path).await?;
    report(outcome, &format!("Scope '{}' deleted.", scope.label));
    Ok(())
}
