//! R-tree of drawing primitive footprints using the rstar crate.
//!
//! Provides O(log n) spatial queries for:
//! - Horizontal bands (frame rendering)
//! - Point hit testing of bubbles

use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};

use crate::config::RenderConfig;
use crate::layout::Diagram;
use crate::tree::CladeNodeId;

/// What a footprint stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Horizontal line across a generation row.
    Divider { generation: usize },
    /// Elbowed parent-child line.
    Connector {
        parent: CladeNodeId,
        child: CladeNodeId,
    },
    /// A bubble, or the straight line replacing a collapsed one.
    Bubble { id: CladeNodeId },
}

/// Bounding box of one primitive, tagged with its draw sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Position in draw order: dividers, then connectors, then bubbles.
    pub sequence: u32,
    pub primitive: Primitive,
    min: [f32; 2],
    max: [f32; 2],
    /// Circle radius for bubbles; zero otherwise.
    radius: f32,
}

impl Footprint {
    pub fn min(&self) -> [f32; 2] {
        self.min
    }

    pub fn max(&self) -> [f32; 2] {
        self.max
    }

    fn center(&self) -> [f32; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for Footprint {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        self.envelope().distance_2(point)
    }

    fn contains_point(&self, point: &[f32; 2]) -> bool {
        match self.primitive {
            Primitive::Bubble { .. } => {
                let [cx, cy] = self.center();
                let dx = point[0] - cx;
                let dy = point[1] - cy;
                dx * dx + dy * dy <= self.radius * self.radius
            }
            _ => self.envelope().contains_point(point),
        }
    }
}

/// Spatial index over every primitive of a diagram.
///
/// Uses an R*-tree for efficient spatial queries.
pub struct SpatialIndex {
    tree: RTree<Footprint>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
        }
    }

    /// Bulk load the footprints of every primitive in `diagram`.
    ///
    /// Line footprints are padded by the line thickness so that a band
    /// query also returns lines whose stroke reaches into the band.
    pub fn for_diagram(diagram: &Diagram, render: &RenderConfig) -> Self {
        let mut footprints = Vec::with_capacity(
            diagram.rows().len() + 2 * diagram.bubbles().len(),
        );
        let mut sequence = 0u32;
        let mut push = |primitive: Primitive, min: [f32; 2], max: [f32; 2], radius: f32| {
            footprints.push(Footprint {
                sequence,
                primitive,
                min,
                max,
                radius,
            });
            sequence += 1;
        };

        if render.generation_lines_enabled {
            let pad = render.generation_line_thickness as f32;
            for (generation, row) in diagram.rows().iter().enumerate() {
                push(
                    Primitive::Divider { generation },
                    [0.0, row.y - pad],
                    [diagram.width(), row.y + pad],
                    0.0,
                );
            }
        }

        let pad = render.diagram_line_thickness as f32;
        for connector in diagram.connectors() {
            let (mut min, mut max) = ([f32::MAX; 2], [f32::MIN; 2]);
            for (x, y) in connector.path {
                min = [min[0].min(x), min[1].min(y)];
                max = [max[0].max(x), max[1].max(y)];
            }
            push(
                Primitive::Connector {
                    parent: connector.parent,
                    child: connector.child,
                },
                [min[0] - pad, min[1] - pad],
                [max[0] + pad, max[1] + pad],
                0.0,
            );
        }

        for bubble in diagram.bubbles() {
            let (min, max) = bubble.bounds();
            push(
                Primitive::Bubble { id: bubble.id },
                min,
                max,
                bubble.radius,
            );
        }

        Self {
            tree: RTree::bulk_load(footprints),
        }
    }

    /// Footprints intersecting the rows `top..=bottom`, in draw order.
    pub fn in_band(&self, top: f32, bottom: f32) -> Vec<&Footprint> {
        let envelope = AABB::from_corners([f32::MIN, top], [f32::MAX, bottom]);
        let mut found: Vec<&Footprint> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .collect();
        found.sort_by_key(|footprint| footprint.sequence);
        found
    }

    /// Bubble whose circle contains the point.
    pub fn bubble_at(&self, x: f32, y: f32) -> Option<CladeNodeId> {
        self.tree
            .locate_all_at_point(&[x, y])
            .filter_map(|footprint| match footprint.primitive {
                Primitive::Bubble { id } => Some(id),
                _ => None,
            })
            .min()
    }

    /// Get the number of footprints in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutConfig, TreeConfig};
    use crate::testing::census;
    use crate::tree::CladeTree;

    fn diagram() -> Diagram {
        let tree = CladeTree::build(
            vec![census(0, &[("1", 20), ("2", 20)]), census(1, &[("1a", 20)])],
            &TreeConfig::default(),
        )
        .unwrap();
        Diagram::compute(tree, &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn test_footprint_counts() {
        let index = SpatialIndex::for_diagram(&diagram(), &RenderConfig::default());
        // 2 dividers + 1 connector + 3 bubbles
        assert_eq!(index.len(), 6);

        let without_lines = RenderConfig {
            generation_lines_enabled: false,
            ..RenderConfig::default()
        };
        assert_eq!(SpatialIndex::for_diagram(&diagram(), &without_lines).len(), 4);
    }

    #[test]
    fn test_band_is_in_draw_order() {
        let index = SpatialIndex::for_diagram(&diagram(), &RenderConfig::default());
        let all = index.in_band(0.0, 10_000.0);
        assert_eq!(all.len(), 6);
        assert!(all.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert!(matches!(all[0].primitive, Primitive::Divider { .. }));
        assert!(matches!(all[2].primitive, Primitive::Connector { .. }));
        assert!(matches!(all[5].primitive, Primitive::Bubble { .. }));
    }

    #[test]
    fn test_band_selects_rows() {
        let diagram = diagram();
        let index = SpatialIndex::for_diagram(&diagram, &RenderConfig::default());

        // Top row (generation 1) spans y 25..73; the bottom row is far below.
        let top: Vec<Primitive> = index.in_band(0.0, 80.0).iter().map(|f| f.primitive).collect();
        assert!(top.contains(&Primitive::Divider { generation: 1 }));
        assert!(!top.contains(&Primitive::Divider { generation: 0 }));
        assert!(top.contains(&Primitive::Bubble { id: CladeNodeId(2) }));
        assert!(!top.contains(&Primitive::Bubble { id: CladeNodeId(0) }));
        assert!(
            top.iter().any(|p| matches!(p, Primitive::Connector { .. })),
            "connector reaches from the bottom row into the top band"
        );
    }

    #[test]
    fn test_bubble_hit_testing() {
        let diagram = diagram();
        let index = SpatialIndex::for_diagram(&diagram, &RenderConfig::default());
        for bubble in diagram.bubbles() {
            assert_eq!(index.bubble_at(bubble.x, bubble.y), Some(bubble.id));
        }
        let first = diagram.bubble(CladeNodeId(0));
        // Inside the bounding box corner but outside the circle.
        assert_eq!(
            index.bubble_at(first.x + first.radius - 1.0, first.y + first.radius - 1.0),
            None
        );
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert!(index.in_band(0.0, 100.0).is_empty());
        assert_eq!(index.bubble_at(0.0, 0.0), None);
    }
}
