//! Spatial indexing of drawing primitives.
//!
//! This module provides an R-tree based spatial index used to paint the
//! diagram one horizontal band at a time and to hit-test bubbles.

mod rtree;

pub use rtree::{Footprint, Primitive, SpatialIndex};
