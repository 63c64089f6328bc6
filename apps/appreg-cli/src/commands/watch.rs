//! Change event watcher
//!
//! Subscribes to the synchronizer's broadcast stream and prints every
//! change as it is published. The directory does not push, so a poll loop
//! re-reads the watched scope; anything that differs after a reload
//! surfaces as events, exactly as an attached UI would see them.

use std::time::Duration;

use chrono::Local;
use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use appreg_tree::TreeChange;

use crate::context::Context;
use crate::error::CliResult;
use crate::output::{print_info, print_warning};
use crate::GlobalArgs;

/// Change event watcher
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Watch one application's subtree instead of the root list
    pub app: Option<String>,

    /// Seconds between polls of the remote directory
    #[arg(long, default_value = "30")]
    pub interval: u64,
}

pub async fn execute(global: &GlobalArgs, args: WatchArgs) -> CliResult<()> {
    let cx = Context::connect(global).await?;
    let mut changes = cx.sync.subscribe();

    let scope = match &args.app {
        Some(needle) => Some(cx.find_app(needle).await?.path),
        None => {
            cx.sync.load_roots().await?;
            None
        }
    };

    print_info(&format!(
        "Watching for changes every {}s. Ctrl-C to stop.",
        args.interval.max(1)
    ));

    let mut poll = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    poll.tick().await; // the first tick fires immediately and we just loaded

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick() => {
                let result = match &scope {
                    Some(path) => cx.sync.reload(path).await,
                    None => cx.sync.load_roots().await.map(|_| ()),
                };
                if let Err(e) = result {
                    print_warning(&format!("poll failed: {e}"));
                }
            }
            change = changes.recv() => match change {
                Ok(change) => print_change(&cx, change).await,
                Err(RecvError::Lagged(missed)) => {
                    print_warning(&format!("missed {missed} change events"));
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    println!();
    print_info("Stopped watching.");
    Ok(())
}

async fn print_change(cx: &Context, change: TreeChange) {
    let stamp = Local::now().format("%H:%M:%S");
    match change {
        TreeChange::Roots => {
            let count = cx.sync.roots().await.len();
            println!("{stamp}  roots replaced ({count} applications)");
        }
        TreeChange::Subtree(path) => {
            match cx.sync.snapshot(&path).await {
                Some(node) => println!("{stamp}  {path} ({})", node.label),
                None => println!("{stamp}  {path} (gone)"),
            }
        }
    }
}
