//! Decision trees for organism behaviour.
//!
//! Implements the evolvable controller:
//! - Binary trees of condition branches over action leaves
//! - Structural ids from a two-digit pre-order encoding
//! - Point mutations (split, replace, collapse)
//! - A deduplicating library with fitness-based pruning

mod library;
mod mutation;
mod node;

pub use library::TreeLibrary;
pub use mutation::Mutation;
pub use node::{ActionKind, ConditionKind, Node, NodeKind, Tree, TreeId};
