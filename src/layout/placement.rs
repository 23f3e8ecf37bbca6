//! Horizontal bubble placement.
//!
//! A bubble's x depends on its left neighbour, its parent, and the deepest
//! reach of the subtrees hanging off earlier bubbles in its row. Those
//! subtrees live in later rows, so there is no single row order to evaluate
//! in; positions are resolved on demand and memoized instead.

use super::bubble::allocation;
use crate::config::LayoutConfig;
use crate::error::{CladeError, Result};
use crate::tree::{CladeNodeId, CladeTree};

#[derive(Debug, Clone, Copy)]
enum Placement {
    Pending,
    Resolving,
    Done(f32),
}

pub(crate) struct HorizontalPlacer<'a> {
    tree: &'a CladeTree,
    config: &'a LayoutConfig,
    radii: &'a [f32],
    /// Widest bubble among a node and the first member of each of its
    /// descendant generations.
    column_radii: Vec<f32>,
    placements: Vec<Placement>,
}

impl<'a> HorizontalPlacer<'a> {
    pub(crate) fn new(tree: &'a CladeTree, config: &'a LayoutConfig, radii: &'a [f32]) -> Self {
        let column_radii = tree
            .ids()
            .map(|id| {
                tree.descendant_layers(id, None)
                    .filter_map(|layer| layer.first().map(|first| radii[first.index()]))
                    .fold(radii[id.index()], f32::max)
            })
            .collect();

        Self {
            tree,
            config,
            radii,
            column_radii,
            placements: vec![Placement::Pending; tree.node_count()],
        }
    }

    /// Resolve every node's x, in id order.
    pub(crate) fn place_all(mut self) -> Result<Vec<f32>> {
        for id in self.tree.ids() {
            self.x(id)?;
        }
        self.placements
            .into_iter()
            .zip(self.tree.ids())
            .map(|(placement, id)| match placement {
                Placement::Done(x) => Ok(x),
                _ => Err(CladeError::PlacementCycle(id)),
            })
            .collect()
    }

    fn x(&mut self, id: CladeNodeId) -> Result<f32> {
        match self.placements[id.index()] {
            Placement::Done(x) => return Ok(x),
            Placement::Resolving => return Err(CladeError::PlacementCycle(id)),
            Placement::Pending => {}
        }

        self.placements[id.index()] = Placement::Resolving;
        let x = self.resolve(id)?;
        self.placements[id.index()] = Placement::Done(x);
        Ok(x)
    }

    fn resolve(&mut self, id: CladeNodeId) -> Result<f32> {
        let tree = self.tree;

        let mut x = match tree.previous_in_row(id) {
            Some(previous) => {
                let mut x = self.offset_from(previous, id)?;
                let lookahead = tree.descendant_layer_count(id) + self.config.placement_dead_zone;
                if lookahead > 0 {
                    if let Some(reach) = self.rightmost_reach(id, lookahead)? {
                        x = x.max(self.offset_from(reach, id)?);
                    }
                }
                x
            }
            None => self.config.edge_margin + self.radii[id.index()],
        };

        if let Some(parent) = tree.parent(id) {
            x = x.max(self.x(parent)?);
        }
        Ok(x)
    }

    /// Leftmost x for `id` that keeps it clear of `other`'s allocation.
    fn offset_from(&mut self, other: CladeNodeId, id: CladeNodeId) -> Result<f32> {
        let radius = self.radii[other.index()];
        Ok(self.x(other)? + allocation(radius, self.config) - radius
            + self.column_radii[id.index()])
    }

    /// Rightmost last member among the descendant generations of every
    /// node left of `id`. Ties keep the first found.
    fn rightmost_reach(&mut self, id: CladeNodeId, lookahead: usize) -> Result<Option<CladeNodeId>> {
        let tree = self.tree;
        let mut rightmost: Option<(CladeNodeId, f32)> = None;

        for earlier in tree.before_in_row(id) {
            for layer in tree.descendant_layers(earlier, Some(lookahead)) {
                let Some(&last) = layer.last() else {
                    continue;
                };
                let x = self.x(last)?;
                if rightmost.is_none_or(|(_, best)| x > best) {
                    rightmost = Some((last, x));
                }
            }
        }
        Ok(rightmost.map(|(id, _)| id))
    }
}
