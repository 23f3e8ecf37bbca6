//! Node identifiers and per-node data of the frozen clade tree.
//!
//! Every retained (generation, lineage) pair becomes one node. Ids are
//! assigned row by row in final row order, so comparing two ids of the
//! same generation compares their horizontal order.

use std::fmt;

/// Index of a node in a [`CladeTree`](super::CladeTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CladeNodeId(pub u32);

impl CladeNodeId {
    /// Create a new CladeNodeId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CladeNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clade({})", self.0)
    }
}

impl From<u32> for CladeNodeId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<CladeNodeId> for u32 {
    #[inline]
    fn from(id: CladeNodeId) -> Self {
        id.0
    }
}

/// One lineage in one generation row.
#[derive(Debug, Clone)]
pub struct CladeNode {
    /// Generation (row) index, 0 = earliest snapshot.
    pub generation: usize,
    /// Index of the lineage within its generation's census.
    pub lineage: usize,
    /// Position within the row.
    pub column: usize,
    /// Closest retained ancestor in the previous row.
    pub parent: Option<CladeNodeId>,
    /// Nodes of the next row whose parent is this node, in row order.
    pub children: Vec<CladeNodeId>,
    /// Number of consecutive non-empty descendant generations.
    pub descendant_layers: usize,
}
