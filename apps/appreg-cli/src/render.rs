//! Renders resolved parts of the cache tree as text or JSON.

use std::future::Future;
use std::pin::Pin;

use appreg_tree::{NodeKind, NodeSnapshot, VisualState};
use serde_json::{json, Value};

use crate::context::Context;
use crate::error::CliResult;
use crate::output::print_key_value;

/// A subtree resolved to a fixed depth, ready to render without further
/// fetching.
pub struct Rendered {
    pub snapshot: NodeSnapshot,
    pub children: Option<Vec<Rendered>>,
}

/// Resolves `depth` levels below `snapshot`. Depth 0 renders the node
/// alone; the tree is two levels deep, so 2 resolves everything.
pub async fn collect(cx: &Context, snapshot: NodeSnapshot, depth: usize) -> CliResult<Rendered> {
    collect_inner(cx, snapshot, depth).await
}

fn collect_inner(
    cx: &Context,
    snapshot: NodeSnapshot,
    depth: usize,
) -> Pin<Box<dyn Future<Output = CliResult<Rendered>> + '_>> {
    Box::pin(async move {
        if depth == 0 || !snapshot.kind.has_children() {
            return Ok(Rendered {
                snapshot,
                children: None,
            });
        }

        let child_snapshots = cx.sync.resolve_children(&snapshot.path).await?;
        let mut children = Vec::with_capacity(child_snapshots.len());
        for child in child_snapshots {
            children.push(collect_inner(cx, child, depth - 1).await?);
        }
        Ok(Rendered {
            snapshot,
            children: Some(children),
        })
    })
}

/// Prints the subtree with box-drawing branches.
pub fn print_tree(node: &Rendered) {
    println!("{}", node_line(&node.snapshot));
    if let Some(children) = &node.children {
        print_branch(children, "");
    }
}

fn print_branch(children: &[Rendered], prefix: &str) {
    for (index, child) in children.iter().enumerate() {
        let last = index + 1 == children.len();
        let connector = if last { "└── " } else { "├── " };
        println!("{prefix}{connector}{}", node_line(&child.snapshot));
        if let Some(grandchildren) = &child.children {
            let deeper = if last { "    " } else { "│   " };
            print_branch(grandchildren, &format!("{prefix}{deeper}"));
        }
    }
}

fn node_line(snapshot: &NodeSnapshot) -> String {
    let mut line = snapshot.label.clone();
    if let Some(description) = &snapshot.description {
        line.push_str(&format!(" ({description})"));
    }
    match snapshot.visual {
        VisualState::Idle => {}
        VisualState::Busy => line.push_str(" [busy]"),
        VisualState::Error => line.push_str(" [error]"),
    }
    line
}

/// JSON form of a resolved subtree, for `--json` output.
pub fn json_tree(node: &Rendered) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("kind".into(), json!(node.snapshot.kind.as_str()));
    map.insert("label".into(), json!(node.snapshot.label));
    if let Some(description) = &node.snapshot.description {
        map.insert("description".into(), json!(description));
    }
    if let Some(value) = &node.snapshot.local_value {
        map.insert("value".into(), json!(value));
    }
    if node.snapshot.kind == NodeKind::Application {
        if let Some(app) = node.snapshot.data.as_application() {
            map.insert("objectId".into(), json!(app.id.to_string()));
            map.insert("appId".into(), json!(app.app_id.to_string()));
        }
    }
    if let Some(children) = &node.children {
        let rendered: Vec<Value> = children.iter().map(json_tree).collect();
        map.insert("children".into(), Value::Array(rendered));
    }
    Value::Object(map)
}

/// The copyable identifiers of an application root.
pub fn print_application_details(root: &NodeSnapshot) {
    print_key_value("Display name", &root.label);
    if let Some(app) = root.data.as_application() {
        print_key_value("Object id", &app.id.to_string());
        print_key_value("App id", &app.app_id.to_string());
    }
}
