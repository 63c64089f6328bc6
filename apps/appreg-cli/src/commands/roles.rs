//! App role commands

use clap::{Args, Subcommand};

use appreg_core::model::{AllowedMemberType, AppRole};
use appreg_tree::NodeKind;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::output::truncate;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// App role commands
#[derive(Args, Debug)]
pub struct RolesArgs {
    #[command(subcommand)]
    pub command: RolesCommands,
}

#[derive(Subcommand, Debug)]
pub enum RolesCommands {
    /// List the app roles an application defines
    List(ListArgs),
    /// Declare a new app role
    Add(AddArgs),
    /// Edit an app role's declaration
    Edit(TargetArgs),
    /// Enable an app role
    Enable(TargetArgs),
    /// Disable an app role
    Disable(TargetArgs),
    /// Delete an app role
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

    /// Role display name, value, or id (picked interactively when omitted)
    pub role: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: RolesArgs) -> CliResult<()> {
    match args.command {
        RolesCommands::List(args) => execute_list(global, args).await,
        RolesCommands::Add(args) => execute_add(global, args).await,
        RolesCommands::Edit(args) => execute_edit(global, args).await,
        RolesCommands::Enable(args) => execute_set_enabled(global, args, true).await,
        RolesCommands::Disable(args) => execute_set_enabled(global, args, false).await,
        RolesCommands::Delete(args) => execute_delete(global, args).await,
    }
}

async fn execute_list(global: &GlobalArgs, args: ListArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::AppRoleGroup).await?;
    let children = cx.sync.resolve_children(&group).await?;

    let roles: Vec<&AppRole> = children.iter().filter_map(|c| c.data.as_role()).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&roles)?);
        return Ok(());
    }

    if roles.is_empty() {
        println!("No app roles defined.");
        println!();
        println!("Declare one with: appreg roles add '{}'", root.label);
        return Ok(());
    }

    println!(
        "{:<26} {:<26} {:<9} {:<20} {:<36}",
        "DISPLAY NAME", "VALUE", "ENABLED", "MEMBERS", "ID"
    );
    println!("{}", "-".repeat(118));
    for role in &roles {
        println!(
            "{:<26} {:<26} {:<9} {:<20} {:<36}",
            truncate(&role.label(), 24),
            truncate(role.value.as_deref().unwrap_or("-"), 24),
            if role.is_enabled { "yes" } else { "no" },
            member_types(&role.allowed_member_types),
            role.id
        );
    }

    Ok(())
}

async fn execute_add(global: &GlobalArgs, args: AddArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::AppRoleGroup).await?;

    let outcome = cx.services.roles.add(&group).await?;
    report(outcome, "App role added.");
    Ok(())
}

async fn execute_edit(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::AppRoleGroup).await?;

    let Some(role) = cx.pick_child(&group, args.role.as_deref(), "app role").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.roles.edit(&role.path).await?;
    report(outcome, &format!("App role '{}' updated.", role.label));
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
    let group = cx.group(&root, NodeKind::AppRoleGroup).await?;

    let Some(role) = cx.pick_child(&group, args.role.as_deref(), "app role").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.roles.set_enabled(&role.path, enabled).await?;
    let state = if enabled { "enabled" } else { "disabled" };
    report(outcome, &format!("App role '{}' {state}.", role.label));
    Ok(())
}

async fn execute_delete(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::AppRoleGroup).await?;

    let Some(role) = cx.pick_child(&group, args.role.as_deref(), "app role").await? else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.roles.delete(&role.path).await?;
    report(outcome, &format!("App role '{}' deleted.", role.label));
    Ok(())
}

fn member_types(types: &[AllowedMemberType]) -> String {
    let words: Vec<&str> = types
        .iter()
        .map(|t| match t {
            AllowedMemberType::User => "Users",
            AllowedMemberType::Application => "Applications",
        })
        .collect();
    if words.is_empty() {
        "-".to_string()
    } else {
        words.join(", ")
    }
}
