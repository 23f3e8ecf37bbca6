//! Organism geometry: colors, genes and the silhouettes they grow into.
//!
//! The layout engine only needs a silhouette's bounding radius; the renderer
//! draws its segments verbatim.

mod color;
mod segment_tree;

pub use color::Rgb;
pub use segment_tree::{Gene, Segment, SegmentTree};
