//! appreg - explore and edit Entra ID application registrations
//!
//! The CLI is a thin shell over the resource tree: commands resolve their
//! target path in the cached tree, then either render what is there or hand
//! the path to a guided service flow. All mutation prompts, validation, and
//! busy handling live in the service layer, not here.

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod context;
mod error;
mod observer;
mod output;
mod prompter;
mod render;

use error::CliResult;

/// appreg - Entra application registration management
#[derive(Parser)]
#[command(name = "appreg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Work against a seeded in-memory directory instead of Microsoft Graph
    #[arg(long, global = true)]
    pub offline: bool,

    /// Microsoft Graph access token
    #[arg(long, env = "APPREG_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Microsoft Graph endpoint override
    #[arg(long, env = "APPREG_GRAPH_URL", global = true)]
    pub graph_url: Option<String>,

    /// Verbose logging (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List, create, rename, and delete application registrations
    Apps(commands::apps::AppsArgs),

    /// Render an application's resource tree
    Tree(commands::tree::TreeArgs),

    /// Manage the app roles an application defines
    Roles(commands::roles::RolesArgs),

    /// Manage client secrets and certificates
    Creds(commands::creds::CredsArgs),

    /// Manage the delegated permission scopes an application exposes
    Scopes(commands::scopes::ScopesArgs),

    /// Manage web redirect URIs
    Uris(commands::uris::UrisArgs),

    /// Show or change the sign-in audience
    Audience(commands::audience::AudienceArgs),

    /// Show or toggle implicit-grant token issuance flags
    Flags(commands::flags::FlagsArgs),

    /// Manage application owners
    Owners(commands::owners::OwnersArgs),

    /// Follow tree change events as they happen
    Watch(commands::watch::WatchArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let global = cli.global.clone();
    match cli.command {
        Commands::Apps(args) => commands::apps::execute(&global, args).await,
        Commands::Tree(args) => commands::tree::execute(&global, args).await,
        Commands::Roles(args) => commands::roles::execute(&global, args).await,
        Commands::Creds(args) => commands::creds::execute(&global, args).await,
        Commands::Scopes(args) => commands::scopes::execute(&global, args).await,
        Commands::Uris(args) => commands::uris::execute(&global, args).await,
        Commands::Audience(args) => commands::audience::execute(&global, args).await,
        Commands::Flags(args) => commands::flags::execute(&global, args).await,
        Commands::Owners(args) => commands::owners::execute(&global, args).await,
        Commands::Watch(args) => commands::watch::execute(&global, args).await,
    }
}

/// Logs go to stderr so JSON output stays pipeable.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "appreg=debug,info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
