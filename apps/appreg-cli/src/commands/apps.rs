//! Application registration commands

use clap::{Args, Subcommand};

use appreg_services::Outcome;
use serde_json::json;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::output::{print_success, truncate};
use crate::prompter::require_tty;
use crate::render;
use crate::GlobalArgs;

/// Application registration commands
#[derive(Args, Debug)]
pub struct AppsArgs {
    #[command(subcommand)]
    pub command: AppsCommands,
}

#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// List all application registrations
    List(ListArgs),
    /// Create a new application registration
    Create(CreateArgs),
    /// Show one application with its resolved resources
    Show(ShowArgs),
    /// Rename an application
    Rename(RenameArgs),
    /// Delete an application registration
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Application display name, object id, or appId
    pub app: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

pub async fn execute(global: &GlobalArgs, args: AppsArgs) -> CliResult<()> {
    match args.command {
        AppsCommands::List(args) => execute_list(global, args).await,
        AppsCommands::Create(args) => execute_create(global, args).await,
        AppsCommands::Show(args) => execute_show(global, args).await,
        AppsCommands::Rename(args) => execute_rename(global, args).await,
        AppsCommands::Delete(args) => execute_delete(global, args).await,
    }
}

async fn execute_list(global: &GlobalArgs, args: ListArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let roots = cx.sync.load_roots().await?;

    if args.json {
        let entries: Vec<_> = roots
            .iter()
            .filter_map(|r| r.data.as_application())
            .map(|a| {
                json!({
                    "displayName": a.label(),
                    "appId": a.app_id.to_string(),
                    "objectId": a.id.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if roots.is_empty() {
        println!("No applications found.");
        println!();
        println!("Create one with: appreg apps create");
        return Ok(());
    }

    println!("{:<34} {:<38} {:<38}", "NAME", "APP ID", "OBJECT ID");
    println!("{}", "-".repeat(110));
    for root in &roots {
        let Some(app) = root.data.as_application() else {
            continue;
        };
        println!(
            "{:<34} {:<38} {:<38}",
            truncate(&root.label, 32),
            app.app_id,
            app.id
        );
    }
    println!();
    println!("{} application(s)", roots.len());

    Ok(())
}

async fn execute_create(global: &GlobalArgs, _args: CreateArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;

    match cx.services.applications.create().await? {
        Outcome::Completed(summary) => {
            print_success(&format!("Application '{}' created.", summary.label()));
            println!();
            println!("  Object id: {}", summary.id);
            println!("  App id:    {}", summary.app_id);
        }
        Outcome::Aborted => println!("Cancelled."),
    }

    Ok(())
}

async fn execute_show(global: &GlobalArgs, args: ShowArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let rendered = render::collect(&cx, root, 2).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&render::json_tree(&rendered))?);
    } else {
        render::print_application_details(&rendered.snapshot);
        println!();
        render::print_tree(&rendered);
    }

    Ok(())
}

async fn execute_rename(global: &GlobalArgs, args: RenameArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;

    let outcome = cx.services.applications.rename(&root.path).await?;
    report(outcome, "Application renamed.");
    Ok(())
}

async fn execute_delete(global: &GlobalArgs, args: DeleteArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let label = root.label.clone();

    let outcome = cx.services.applications.delete(&root.path).await?;
    report(outcome, &format!("Application '{label}' deleted."));
    Ok(())
}
