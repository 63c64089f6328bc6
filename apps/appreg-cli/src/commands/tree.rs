//! Tree rendering command

use clap::Args;

use crate::context::Context;
use crate::error::CliResult;
use crate::render;
use crate::GlobalArgs;

/// Render an application's resource tree
#[derive(Args, Debug)]
pub struct TreeArgs {
    /// Application display name, object id, or appId
    pub app: String,

    /// How many levels below the application to resolve
    #[arg(long, default_value = "2")]
    pub depth: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(global: &GlobalArgs, args: TreeArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let root = cx.find_app(&args.app).await?;
    let rendered = render::collect(&cx, root, args.depth).await?;

    if args.json {
        let value = render::json_tree(&rendered);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        render::print_tree(&rendered);
    }

    Ok(())
}
