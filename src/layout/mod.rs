//! Diagram layout.
//!
//! This module turns a frozen [`CladeTree`](crate::tree::CladeTree) into
//! pixel geometry: a bubble per node, one horizontal row per generation
//! (earliest at the bottom), and elbowed connectors between parents and
//! children. Layout never changes the tree.

pub mod bubble;
pub mod diagram;
mod placement;

pub use bubble::{allocation, bubble_radius, Bubble};
pub use diagram::{Connector, Diagram, RowMetrics};
