//! Clade tree construction.
//!
//! - `builder`: parent resolution, pruning and sibling reordering on a
//!   mutable petgraph working set
//! - `arena`: the frozen, row-major result
//! - `node`: node ids and per-node data

mod arena;
mod builder;
mod node;

pub use arena::{CladeTree, DescendantLayers};
pub use builder::build_tree;
pub use node::{CladeNode, CladeNodeId};
