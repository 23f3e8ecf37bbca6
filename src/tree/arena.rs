//! Frozen clade tree.
//!
//! Nodes are stored row-major in one vector; each generation owns a
//! contiguous id range. Layout and rendering only read from it.

use std::ops::Range;

use super::node::{CladeNode, CladeNodeId};
use crate::config::TreeConfig;
use crate::error::Result;
use crate::lineage::{Census, Lineage, Variant};

/// Immutable tree of retained lineages, one row per generation.
#[derive(Debug, Clone)]
pub struct CladeTree {
    censuses: Vec<Census>,
    nodes: Vec<CladeNode>,
    rows: Vec<Range<usize>>,
}

impl CladeTree {
    pub(super) fn new(censuses: Vec<Census>, nodes: Vec<CladeNode>, rows: Vec<Range<usize>>) -> Self {
        Self {
            censuses,
            nodes,
            rows,
        }
    }

    /// Resolve, prune and reorder `censuses` into a tree.
    pub fn build(censuses: Vec<Census>, config: &TreeConfig) -> Result<Self> {
        super::builder::build_tree(censuses, config)
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Number of generations, including ones left empty by pruning.
    pub fn generation_count(&self) -> usize {
        self.rows.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn census(&self, generation: usize) -> &Census {
        &self.censuses[generation]
    }

    /// Ids of one generation, left to right.
    pub fn row(&self, generation: usize) -> impl DoubleEndedIterator<Item = CladeNodeId> + ExactSizeIterator + Clone + use<> {
        self.rows[generation].clone().map(|i| CladeNodeId(i as u32))
    }

    /// All ids, row by row.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = CladeNodeId> + ExactSizeIterator + use<> {
        (0..self.nodes.len() as u32).map(CladeNodeId)
    }

    /// Ids of the nodes left of `id` in its row.
    pub fn before_in_row(&self, id: CladeNodeId) -> impl DoubleEndedIterator<Item = CladeNodeId> + use<> {
        let start = self.rows[self.node(id).generation].start;
        (start..id.index()).map(|i| CladeNodeId(i as u32))
    }

    /// Left neighbour of `id`.
    pub fn previous_in_row(&self, id: CladeNodeId) -> Option<CladeNodeId> {
        (self.node(id).column > 0).then(|| CladeNodeId(id.0 - 1))
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    pub fn node(&self, id: CladeNodeId) -> &CladeNode {
        &self.nodes[id.index()]
    }

    pub fn lineage(&self, id: CladeNodeId) -> &Lineage {
        let node = self.node(id);
        &self.censuses[node.generation].lineages()[node.lineage]
    }

    /// Most populous variant of the node's lineage.
    pub fn representative(&self, id: CladeNodeId) -> &Variant {
        self.lineage(id).representative()
    }

    pub fn parent(&self, id: CladeNodeId) -> Option<CladeNodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: CladeNodeId) -> &[CladeNodeId] {
        &self.node(id).children
    }

    pub fn descendant_layer_count(&self, id: CladeNodeId) -> usize {
        self.node(id).descendant_layers
    }

    /// Nodes without a parent, in id order.
    pub fn roots(&self) -> impl Iterator<Item = CladeNodeId> + '_ {
        self.ids().filter(|&id| self.parent(id).is_none())
    }

    /// Descendants of `id` grouped by generation, nearest first, at most
    /// `limit` generations deep.
    pub fn descendant_layers(&self, id: CladeNodeId, limit: Option<usize>) -> DescendantLayers<'_> {
        DescendantLayers {
            tree: self,
            frontier: vec![id],
            remaining: limit,
        }
    }

    /// A node on an unbranching run of one unchanged variant.
    ///
    /// True when the node has exactly one child, its parent has exactly one
    /// child, and all three share the same representative variant.
    pub fn is_straight_run(&self, id: CladeNodeId) -> bool {
        let [child] = self.children(id) else {
            return false;
        };
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let representative = self.representative(id);
        self.children(parent).len() == 1
            && self.representative(parent) == representative
            && self.representative(*child) == representative
    }
}

/// Iterator over the descendant generations of a node.
///
/// Each layer lists its members in row order.
pub struct DescendantLayers<'a> {
    tree: &'a CladeTree,
    frontier: Vec<CladeNodeId>,
    remaining: Option<usize>,
}

impl Iterator for DescendantLayers<'_> {
    type Item = Vec<CladeNodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            return None;
        }
        let layer: Vec<CladeNodeId> = self
            .frontier
            .iter()
            .flat_map(|&id| self.tree.children(id).iter().copied())
            .collect();
        if layer.is_empty() {
            return None;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        self.frontier.clone_from(&layer);
        Some(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{census, census_with_lengths};

    fn keep_all() -> TreeConfig {
        TreeConfig {
            population_threshold: 0,
            ..TreeConfig::default()
        }
    }

    fn sample() -> CladeTree {
        CladeTree::build(
            vec![
                census(0, &[("1", 20), ("2", 20)]),
                census(1, &[("1a", 20), ("1b", 20), ("2", 20)]),
                census(2, &[("1a-1", 20), ("1a-2", 20), ("2", 20)]),
            ],
            &keep_all(),
        )
        .unwrap()
    }

    fn named(tree: &CladeTree, generation: usize, name: &str) -> CladeNodeId {
        tree.row(generation)
            .find(|&id| tree.lineage(id).id().as_str() == name)
            .unwrap()
    }

    #[test]
    fn test_rows_are_contiguous() {
        let tree = sample();
        assert_eq!(tree.generation_count(), 3);
        assert_eq!(tree.node_count(), 8);
        let mut next = 0;
        for g in 0..tree.generation_count() {
            for (column, id) in tree.row(g).enumerate() {
                assert_eq!(id.raw(), next, "ids are row-major");
                assert_eq!(tree.node(id).column, column);
                assert_eq!(tree.node(id).generation, g);
                next += 1;
            }
        }
    }

    #[test]
    fn test_row_neighbours() {
        let tree = sample();
        let first = tree.row(1).next().unwrap();
        let last = tree.row(1).last().unwrap();
        assert_eq!(tree.previous_in_row(first), None);
        assert_eq!(tree.previous_in_row(last), Some(CladeNodeId(last.0 - 1)));
        assert_eq!(tree.before_in_row(last).count(), 2);
        assert_eq!(tree.before_in_row(first).count(), 0);
    }

    #[test]
    fn test_descendant_layers() {
        let tree = sample();
        let one = named(&tree, 0, "1");
        let layers: Vec<usize> = tree.descendant_layers(one, None).map(|l| l.len()).collect();
        assert_eq!(layers, vec![2, 2]);
        assert_eq!(tree.descendant_layer_count(one), 2);

        let limited: Vec<usize> = tree
            .descendant_layers(one, Some(1))
            .map(|l| l.len())
            .collect();
        assert_eq!(limited, vec![2]);
        assert_eq!(tree.descendant_layers(one, Some(0)).count(), 0);
    }

    #[test]
    fn test_descendant_layers_follow_row_order() {
        let tree = sample();
        let one = named(&tree, 0, "1");
        for layer in tree.descendant_layers(one, None) {
            assert!(layer.windows(2).all(|w| w[0] < w[1]), "layer {layer:?} out of row order");
        }
    }

    #[test]
    fn test_roots() {
        let tree = sample();
        let roots: Vec<&str> = tree
            .roots()
            .map(|id| tree.lineage(id).id().as_str())
            .collect();
        assert_eq!(roots, vec!["1", "2"]);
    }

    #[test]
    fn test_straight_run_requires_unchanged_single_line() {
        let tree = sample();
        let middle_two = named(&tree, 1, "2");
        assert!(tree.is_straight_run(middle_two));
        assert!(!tree.is_straight_run(named(&tree, 0, "2")), "no parent");
        assert!(!tree.is_straight_run(named(&tree, 2, "2")), "no child");
        assert!(!tree.is_straight_run(named(&tree, 1, "1a")), "two children");
    }

    #[test]
    fn test_straight_run_breaks_on_shape_change() {
        let tree = CladeTree::build(
            vec![
                census_with_lengths(0, &[("4", 20, 10.0)]),
                census_with_lengths(1, &[("4", 20, 10.0)]),
                census_with_lengths(2, &[("4", 20, 30.0)]),
            ],
            &keep_all(),
        )
        .unwrap();
        assert!(!tree.is_straight_run(CladeNodeId(1)));
    }
}
