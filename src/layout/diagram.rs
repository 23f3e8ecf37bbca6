//! Diagram layout: bubble positions, row metrics and connectors.

use tracing::{debug, info};

use super::bubble::{bubble_radius, Bubble};
use super::placement::HorizontalPlacer;
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::tree::{CladeNodeId, CladeTree};

/// Vertical metrics of one generation row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowMetrics {
    /// Center line of the row's bubbles.
    pub y: f32,
    /// Largest bubble diameter in the row.
    pub height: f32,
    /// Right edge of the last bubble plus the edge margin.
    pub width: f32,
}

/// Elbowed line from a parent bubble's top to a child bubble's bottom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connector {
    pub parent: CladeNodeId,
    pub child: CladeNodeId,
    pub path: [(f32, f32); 4],
}

/// A fully laid out clade tree.
///
/// Generation 0 is the bottom row; later generations stack upwards.
#[derive(Debug, Clone)]
pub struct Diagram {
    tree: CladeTree,
    bubbles: Vec<Bubble>,
    rows: Vec<RowMetrics>,
    width: f32,
    height: f32,
}

impl Diagram {
    /// Lay out `tree`.
    pub fn compute(tree: CladeTree, config: &LayoutConfig) -> Result<Self> {
        info!(nodes = tree.node_count(), "laying out diagram");

        let radii: Vec<f32> = tree
            .ids()
            .map(|id| bubble_radius(tree.representative(id), config))
            .collect();

        let heights: Vec<f32> = (0..tree.generation_count())
            .map(|g| {
                tree.row(g)
                    .map(|id| 2.0 * radii[id.index()])
                    .reduce(f32::max)
                    .unwrap_or(2.0 * config.node_min_radius)
            })
            .collect();
        let padded = |h: f32| (h + config.generation_margin).max(config.generation_min_height);

        // y(g) = edge + padded heights of every later row + h(g) / 2
        let mut ys = vec![0.0; heights.len()];
        let mut above = 0.0;
        for g in (0..heights.len()).rev() {
            ys[g] = config.edge_margin + above + heights[g] / 2.0;
            above += padded(heights[g]);
        }

        let xs = HorizontalPlacer::new(&tree, config, &radii).place_all()?;

        let bubbles: Vec<Bubble> = tree
            .ids()
            .map(|id| Bubble {
                id,
                x: xs[id.index()],
                y: ys[tree.node(id).generation],
                radius: radii[id.index()],
                collapsed: tree.is_straight_run(id),
            })
            .collect();

        let rows: Vec<RowMetrics> = (0..tree.generation_count())
            .map(|g| {
                let width = match tree.row(g).last() {
                    Some(last) => {
                        let bubble = &bubbles[last.index()];
                        bubble.x + bubble.radius + config.edge_margin
                    }
                    None => 2.0 * config.node_min_radius + 2.0 * config.edge_margin,
                };
                debug!(generation = g, y = ys[g], height = heights[g], width, "row metrics");
                RowMetrics {
                    y: ys[g],
                    height: heights[g],
                    width,
                }
            })
            .collect();

        let width = rows.iter().map(|row| row.width).fold(0.0, f32::max);
        let height = config.edge_margin
            + heights.iter().skip(1).map(|&h| padded(h)).sum::<f32>()
            + heights[0]
            + config.edge_margin;

        info!(width, height, "diagram laid out");
        Ok(Self {
            tree,
            bubbles,
            rows,
            width,
            height,
        })
    }

    pub fn tree(&self) -> &CladeTree {
        &self.tree
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn bubble(&self, id: CladeNodeId) -> &Bubble {
        &self.bubbles[id.index()]
    }

    pub fn rows(&self) -> &[RowMetrics] {
        &self.rows
    }

    pub fn row_y(&self, generation: usize) -> f32 {
        self.rows[generation].y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Image size in whole pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.width.ceil() as u32, self.height.ceil() as u32)
    }

    /// Y of the horizontal connector segment between two rows.
    pub fn midpoint(&self, from: usize, to: usize) -> f32 {
        let from_y = self.row_y(from);
        (from_y + (self.row_y(to) - from_y) / 2.0).round_ties_even()
    }

    /// Connectors from every bubble to each of its children.
    pub fn connectors(&self) -> impl Iterator<Item = Connector> + '_ {
        self.tree.ids().flat_map(move |parent| {
            self.tree
                .children(parent)
                .iter()
                .map(move |&child| self.connector(parent, child))
        })
    }

    /// Connector between `parent` and one of its children.
    pub fn connector(&self, parent: CladeNodeId, child: CladeNodeId) -> Connector {
        let from = self.bubble(parent);
        let to = self.bubble(child);
        let mid = self.midpoint(
            self.tree.node(parent).generation,
            self.tree.node(child).generation,
        );
        Connector {
            parent,
            child,
            path: [from.top(), (from.x, mid), (to.x, mid), to.bottom()],
        }
    }
}
