//! Tree construction from a sequence of censuses.
//!
//! The working tree lives in a petgraph `StableGraph` so that pruning can
//! remove nodes without invalidating the indices held by the rows. Parent
//! edges are recomputed from scratch after every structural change, then the
//! result is frozen into a [`CladeTree`] arena.

use std::collections::HashMap;

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::NodeIndexable;
use petgraph::{Directed, Direction};
use tracing::{debug, info};

use super::arena::CladeTree;
use super::node::{CladeNode, CladeNodeId};
use crate::config::TreeConfig;
use crate::error::{CladeError, Result};
use crate::lineage::{Census, Lineage};

/// Where a working node's lineage lives.
#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: usize,
    lineage: usize,
}

/// Mutable tree used while resolving, pruning and reordering.
struct TreeBuilder {
    /// Edges always point parent -> child.
    graph: StableGraph<Slot, (), Directed>,
    rows: Vec<Vec<NodeIndex>>,
    censuses: Vec<Census>,
}

/// Build the frozen clade tree for `censuses` (earliest first).
pub fn build_tree(censuses: Vec<Census>, config: &TreeConfig) -> Result<CladeTree> {
    let mut builder = TreeBuilder::materialize(censuses)?;
    info!(
        generations = builder.rows.len(),
        nodes = builder.graph.node_count(),
        "building clade tree"
    );

    builder.resolve_parents();
    builder.prune(config);
    builder.resolve_parents();
    builder.reorder();

    let tree = builder.freeze();
    info!(nodes = tree.node_count(), "clade tree ready");
    Ok(tree)
}

impl TreeBuilder {
    /// One row per census, one node per lineage, in census order.
    fn materialize(censuses: Vec<Census>) -> Result<Self> {
        if censuses.is_empty() {
            return Err(CladeError::NoGenerations);
        }

        let capacity = censuses.iter().map(Census::species_count).sum();
        let mut graph = StableGraph::with_capacity(capacity, capacity);
        let mut rows = Vec::with_capacity(censuses.len());
        for (generation, census) in censuses.iter().enumerate() {
            let mut row = Vec::with_capacity(census.species_count());
            for lineage in 0..census.species_count() {
                row.push(graph.add_node(Slot { generation, lineage }));
            }
            rows.push(row);
        }

        Ok(Self {
            graph,
            rows,
            censuses,
        })
    }

    fn lineage(&self, node: NodeIndex) -> &Lineage {
        let slot = self.graph[node];
        &self.censuses[slot.generation].lineages()[slot.lineage]
    }

    fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
    }

    // =========================================================================
    // Parent Resolution
    // =========================================================================

    /// Link every node to the closest direct ancestor in the previous row.
    fn resolve_parents(&mut self) {
        self.graph.clear_edges();
        for generation in 1..self.rows.len() {
            self.link_row(generation);
        }
    }

    /// Replace the parent edges of one row, resolved against the current
    /// order of the previous row.
    fn relink_row(&mut self, generation: usize) {
        for &node in &self.rows[generation] {
            let edge = self
                .parent(node)
                .and_then(|parent| self.graph.find_edge(parent, node));
            if let Some(edge) = edge {
                self.graph.remove_edge(edge);
            }
        }
        self.link_row(generation);
    }

    /// Add parent edges for a row whose nodes have none.
    ///
    /// Candidates are looked up by identifier prefix, longest first, so the
    /// first hit has the minimal distance. Equal identifiers in the previous
    /// row resolve to the earliest one.
    fn link_row(&mut self, generation: usize) {
        let mut previous: HashMap<(u64, &[String]), NodeIndex> = HashMap::new();
        for &node in &self.rows[generation - 1] {
            let id = self.lineage(node).id();
            previous.entry((id.root_id(), id.path())).or_insert(node);
        }

        let mut edges = Vec::new();
        for &node in &self.rows[generation] {
            let id = self.lineage(node).id();
            let parent = (0..=id.depth())
                .rev()
                .find_map(|keep| previous.get(&(id.root_id(), &id.path()[..keep])));
            if let Some(&parent) = parent {
                edges.push((parent, node));
            }
        }

        for (parent, child) in edges {
            self.graph.add_edge(parent, child, ());
        }
    }

    // =========================================================================
    // Inclusion Filter
    // =========================================================================

    /// Drop every node that fails the inclusion test.
    ///
    /// All decisions are made against the unfiltered tree before anything
    /// is removed, so a higher threshold can only shrink the rows.
    fn prune(&mut self, config: &TreeConfig) {
        let threshold = u64::from(config.population_threshold);
        let limit = config.extinction_dead_zone.limit();

        let mut kept = vec![false; self.graph.node_bound()];
        for row in &self.rows {
            for &node in row {
                let lineage = self.lineage(node);
                let continues_parent = self.parent(node).is_some_and(|parent| {
                    kept[parent.index()] && self.lineage(parent).id() == lineage.id()
                });
                kept[node.index()] = u64::from(lineage.population()) >= threshold
                    || continues_parent
                    || self.has_populous_layer(node, threshold, limit);
            }
        }

        let before = self.graph.node_count();
        for row in &mut self.rows {
            row.retain(|node| kept[node.index()]);
        }
        self.graph.retain_nodes(|_, node| kept[node.index()]);

        for (generation, row) in self.rows.iter().enumerate() {
            debug!(generation, retained = row.len(), "pruned generation");
        }
        info!(
            threshold,
            removed = before - self.graph.node_count(),
            remaining = self.graph.node_count(),
            "pruned sparse lineages"
        );
    }

    /// Whether some descendant generation of `node`, at most `limit` deep,
    /// sums to at least `threshold` organisms.
    fn has_populous_layer(&self, node: NodeIndex, threshold: u64, limit: Option<usize>) -> bool {
        let mut frontier = vec![node];
        let mut depth = 0;
        while limit.is_none_or(|limit| depth < limit) {
            frontier = frontier
                .iter()
                .flat_map(|&n| self.graph.neighbors_directed(n, Direction::Outgoing))
                .collect();
            if frontier.is_empty() {
                return false;
            }
            let total: u64 = frontier
                .iter()
                .map(|&n| u64::from(self.lineage(n).population()))
                .sum();
            if total >= threshold {
                return true;
            }
            depth += 1;
        }
        false
    }

    // =========================================================================
    // Sibling Reordering
    // =========================================================================

    /// Descendant-layer count per node index, computed bottom-up.
    fn layer_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.graph.node_bound()];
        for row in self.rows.iter().rev() {
            for &node in row {
                counts[node.index()] = self
                    .graph
                    .neighbors_directed(node, Direction::Outgoing)
                    .map(|child| counts[child.index()] + 1)
                    .max()
                    .unwrap_or(0);
            }
        }
        counts
    }

    /// Group each row under the order of the previous row and put the
    /// deepest sibling first.
    ///
    /// Each row is relinked against the already reordered previous row
    /// before grouping, so the grouping matches the parents frozen later.
    fn reorder(&mut self) {
        let counts = self.layer_counts();

        for generation in 1..self.rows.len() {
            self.relink_row(generation);
            let mut children: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
            let mut orphans = Vec::new();
            for &node in &self.rows[generation] {
                match self.parent(node) {
                    Some(parent) => children.entry(parent).or_default().push(node),
                    None => orphans.push(node),
                }
            }

            let mut ordered = Vec::with_capacity(self.rows[generation].len());
            for parent in &self.rows[generation - 1] {
                if let Some(siblings) = children.remove(parent) {
                    ordered.extend(deepest_first(siblings, &counts));
                }
            }
            ordered.extend(deepest_first(orphans, &counts));
            self.rows[generation] = ordered;
        }
    }

    // =========================================================================
    // Freeze
    // =========================================================================

    fn freeze(mut self) -> CladeTree {
        self.resolve_parents();

        let mut ids: HashMap<NodeIndex, CladeNodeId> = HashMap::with_capacity(self.graph.node_count());
        let mut nodes: Vec<CladeNode> = Vec::with_capacity(self.graph.node_count());
        let mut rows = Vec::with_capacity(self.rows.len());

        for (generation, row) in self.rows.iter().enumerate() {
            let start = nodes.len();
            for (column, &index) in row.iter().enumerate() {
                let id = CladeNodeId(nodes.len() as u32);
                ids.insert(index, id);
                let parent = self.parent(index).and_then(|p| ids.get(&p).copied());
                if let Some(parent) = parent {
                    nodes[parent.index()].children.push(id);
                }
                nodes.push(CladeNode {
                    generation,
                    lineage: self.graph[index].lineage,
                    column,
                    parent,
                    children: Vec::new(),
                    descendant_layers: 0,
                });
            }
            rows.push(start..nodes.len());
        }

        // Children always have larger ids than their parent.
        for i in (0..nodes.len()).rev() {
            let layers = nodes[i]
                .children
                .iter()
                .map(|child| nodes[child.index()].descendant_layers + 1)
                .max()
                .unwrap_or(0);
            nodes[i].descendant_layers = layers;
        }

        CladeTree::new(self.censuses, nodes, rows)
    }
}

/// Stable ascending sort by descendant-layer count, then the last (deepest)
/// sibling moves to the front.
fn deepest_first(mut siblings: Vec<NodeIndex>, counts: &[usize]) -> Vec<NodeIndex> {
    siblings.sort_by_key(|node| counts[node.index()]);
    if let Some(deepest) = siblings.pop() {
        siblings.insert(0, deepest);
    }
    siblings
}
