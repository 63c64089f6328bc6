//! Credential commands

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};

use appreg_tree::{NodeData, NodeKind, NodeSnapshot};
use serde_json::json;

use crate::commands::report;
use crate::context::Context;
use crate::error::CliResult;
use crate::output::truncate;
use crate::prompter::require_tty;
use crate::GlobalArgs;

/// Credential commands
#[derive(Args, Debug)]
pub struct CredsArgs {
    #[command(subcommand)]
    pub command: CredsCommands,
}

#[derive(Subcommand, Debug)]
pub enum CredsCommands {
    /// List client secrets and certificates
    List(ListArgs),
    /// Add a client secret
    AddSecret(AddSecretArgs),
    /// Delete a credential
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
pub struct AddSecretArgs {
    /// Application display name, object id, or appId
    pub app: String,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Application display name, object id, or appId
    pub app: String,

    /// Credential display name or key id (picked interactively when omitted)
    pub credential: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: CredsArgs) -> CliResult<()> {
    match args.command {
        CredsCommands::List(args) => execute_list(global, args).await,
        CredsCommands::AddSecret(args) => execute_add_secret(global, args).await,
        CredsCommands::Delete(args) => execute_delete(global, args).await,
    }
}

async fn execute_list(global: &GlobalArgs, args: ListArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::CredentialGroup).await?;
    let children = cx.sync.resolve_children(&group).await?;

    if args.json {
        let entries: Vec<_> = children.iter().filter_map(json_row).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if children.is_empty() {
        println!("No credentials configured.");
        println!();
        println!("Add a client secret with: appreg creds add-secret '{}'", root.label);
        return Ok(());
    }

    println!(
        "{:<13} {:<26} {:<12} {:<36}",
        "TYPE", "NAME", "EXPIRES", "KEY ID"
    );
    println!("{}", "-".repeat(88));
    for child in &children {
        let Some((kind, expires, key_id)) = table_row(child) else {
            continue;
        };
        println!(
            "{:<13} {:<26} {:<12} {:<36}",
            kind,
            truncate(&child.label, 24),
            expires,
            key_id
        );
    }

    Ok(())
}

async fn execute_add_secret(global: &GlobalArgs, args: AddSecretArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::CredentialGroup).await?;

    let outcome = cx.services.credentials.add_secret(&group).await?;
    report(outcome, "Client secret added.");
    Ok(())
}

async fn execute_delete(global: &GlobalArgs, args: TargetArgs) -> CliResult<()> {
    require_tty()?;
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let group = cx.group(&root, NodeKind::CredentialGroup).await?;

    let picked = cx
        .pick_child(&group, args.credential.as_deref(), "credential")
        .await?;
    let Some(credential) = picked else {
        println!("Cancelled.");
        return Ok(());
    };

    let outcome = cx.services.credentials.delete(&credential.path).await?;
    report(outcome, &format!("Credential '{}' deleted.", credential.label));
    Ok(())
}

fn table_row(snapshot: &NodeSnapshot) -> Option<(&'static str, String, String)> {
    match &snapshot.data {
        NodeData::Password(cred) => {
            Some(("secret", expiry(cred.end_date_time), cred.key_id.to_string()))
        }
        NodeData::Certificate(cred) => Some((
            "certificate",
            expiry(cred.end_date_time),
            cred.key_id.to_string(),
        )),
        _ => None,
    }
}

fn json_row(snapshot: &NodeSnapshot) -> Option<serde_json::Value> {
    let (kind, expires, key_id) = table_row(snapshot)?;
    Some(json!({
        "type": kind,
        "displayName": snapshot.label,
        "expires": expires,
        "keyId": key_id,
    }))
}

fn expiry(end: Option<DateTime<Utc>>) -> String {
    match end {
        Some(end) => end.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}
