//! Lazily-populated cache tree over a remote directory, with a uniform
//! mutation protocol.
//!
//! The pieces:
//!
//! - [`tree::CacheTree`]: the arena of cached nodes; plain data.
//! - [`sync::TreeSynchronizer`]: the sole writer, with lazy child
//!   resolution, coalesced fetches, full and partial reloads, and change
//!   events.
//! - [`mutation::MutationRunner`]: Begin / Execute / Complete around
//!   every write, with busy-state bracketing and rollback on failure.
//! - [`observer::OperationObserver`]: the one place progress and errors
//!   surface.
//!
//! Consumers never hold references into the tree; they work with
//! [`node::NodeSnapshot`]s and re-read on [`events::TreeChange`].

mod build;

pub mod events;
pub mod mutation;
pub mod node;
pub mod observer;
pub mod path;
pub mod sync;
pub mod tree;

pub use events::TreeChange;
pub use mutation::{MutationPlan, MutationRunner, MutationTarget, Refresh};
pub use node::{NodeData, NodeId, NodeKind, NodeSnapshot, TreeNode, VisualState};
pub use observer::{LogObserver, OperationObserver};
pub use path::{NodePath, PathSegment};
pub use sync::TreeSynchronizer;
pub use tree::{CacheTree, InsertPosition};
