//! Sign-in audience commands

use clap::{Args, Subcommand};

use appreg_tree::NodeKind;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::output::print_key_value;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// Sign-in audience commands
#[derive(Args, Debug)]
pub struct AudienceArgs {
    #[command(subcommand)]
    pub command: AudienceCommands,
}

#[derive(Subcommand, Debug)]
pub enum AudienceCommands {
    /// Show which account types can sign in
    Show(ShowArgs),
    /// Change the sign-in audience
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

pub async fn execute(global: &GlobalArgs, args: AudienceArgs) -> CliResult<()> {
    match args.command {
        AudienceCommands::Show(args) => execute_show(global, args).await,
        AudienceCommands::Set(args) => execute_set(global, args).await,
    }
}

async fn execute_show(global: &GlobalArgs, args: ShowArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let path = root.path.child(NodeKind::Audience);
    let node = cx.sync.ensure_path(&path).await?;

    if let Some(audience) = node.data.as_audience() {
        print_key_value("Sign-in audience", audience.describe());
        print_key_value("Wire value", audience.as_str());
    }
    Ok(())
}

async fn execute_set(global: &GlobalArgs, args: SetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let path = root.path.child(NodeKind::Audience);
    cx.sync.ensure_path(&path).await?;

    let outcome = cx.services.audience.change(&path).await?;
    report(outcome, "Sign-in audience updated.");
    Ok(())
}
