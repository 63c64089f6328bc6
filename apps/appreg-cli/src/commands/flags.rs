//! Implicit-grant token flag commands

use clap::{Args, Subcommand};

use appreg_core::model::TokenFlow;
use appreg_tree::NodeKind;

use crate::commands::report;
use crate::context::Context;
use crate::error::{CliError, CliResult};
use crate::output::print_key_value;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// Implicit-grant token flag commands
#[derive(Args, Debug)]
pub struct FlagsArgs {
    #[command(subcommand)]
    pub command: FlagsCommands,
}

#[derive(Subcommand, Debug)]
pub enum FlagsCommands {
    /// Show both token issuance flags
    Show(ShowArgs),
    /// Flip one token issuance flag
    Toggle(ToggleArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Application display name, object id, or appId
    pub app: String,

    /// Which flag: id-token or access-token
    pub flow: String,
}

pub async fn execute(global: &GlobalArgs, args: FlagsArgs) -> CliResult<()> {
    match args.command {
        FlagsCommands::Show(args) => execute_show(global, args).await,
        FlagsCommands::Toggle(args) => execute_toggle(global, args).await,
    }
}

async fn execute_show(global: &GlobalArgs, args: ShowArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;

    for flow in TokenFlow::ALL {
        let path = root
            .path
            .child_value(NodeKind::TokenFlowFlag, flow.as_str());
        let node = cx.sync.ensure_path(&path).await?;
        if let Some((flow, enabled)) = node.data.as_token_flag() {
            let state = if enabled { "enabled" } else { "disabled" };
            print_key_value(flow.describe(), state);
        }
    }
    Ok(())
}

async fn execute_toggle(global: &GlobalArgs, args: ToggleArgs) -> CliResult<()> {
    require_tty()?;
    let flow = parse_flow(&args.flow)?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;

    let path = root
        .path
        .child_value(NodeKind::TokenFlowFlag, flow.as_str());
    cx.sync.ensure_path(&path).await?;

    let outcome = cx.services.token_flags.toggle(&path).await?;
    report(outcome, &format!("{} updated.", flow.describe()));
    Ok(())
}

/// Accepts the obvious spellings; the wire names also work.
fn parse_flow(input: &str) -> CliResult<TokenFlow> {
    let collapsed: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match collapsed.as_str() {
        "id" | "idtoken" => Ok(TokenFlow::IdToken),
        "access" | "accesstoken" => Ok(TokenFlow::AccessToken),
        _ => Err(CliError::Validation(format!(
            "unknown token flag '{input}'. Use 'id-token' or 'access-token'."
        ))),
    }
}
