//! Bubble geometry.
//!
//! A bubble is the circle a lineage is drawn in. Its radius comes from the
//! representative variant's silhouette; its position from placement.

use crate::config::LayoutConfig;
use crate::lineage::Variant;
use crate::tree::CladeNodeId;

/// Radius of the bubble drawn around `variant`.
///
/// The silhouette radius is rounded half-to-even before padding.
pub fn bubble_radius(variant: &Variant, config: &LayoutConfig) -> f32 {
    let silhouette = variant.radius().round_ties_even() as f32;
    (silhouette + config.node_padding).max(config.node_min_radius)
}

/// Horizontal space a bubble claims to its right, measured from its left
/// edge.
pub fn allocation(radius: f32, config: &LayoutConfig) -> f32 {
    (2.0 * radius + config.species_margin).max(config.species_min_width)
}

/// A placed bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bubble {
    pub id: CladeNodeId,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Drawn as a plain line through the bubble instead of a circle.
    pub collapsed: bool,
}

impl Bubble {
    pub fn center(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Top of the circle, where connectors to the parent start.
    pub fn top(&self) -> (f32, f32) {
        (self.x, self.y - self.radius)
    }

    /// Bottom of the circle, where connectors from children end.
    pub fn bottom(&self) -> (f32, f32) {
        (self.x, self.y + self.radius)
    }

    pub fn diameter(&self) -> f32 {
        2.0 * self.radius
    }

    /// Bounding box as `(min, max)` corners.
    pub fn bounds(&self) -> ([f32; 2], [f32; 2]) {
        (
            [self.x - self.radius, self.y - self.radius],
            [self.x + self.radius, self.y + self.radius],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::variant;

    #[test]
    fn test_radius_is_padded_and_clamped() {
        let config = LayoutConfig::default();
        assert_eq!(bubble_radius(&variant(10.0), &config), 24.0, "clamped to minimum");
        assert_eq!(bubble_radius(&variant(30.0), &config), 44.0);
    }

    #[test]
    fn test_radius_rounds_half_to_even() {
        let config = LayoutConfig::default();
        assert_eq!(bubble_radius(&variant(30.5), &config), 44.0);
        assert_eq!(bubble_radius(&variant(31.5), &config), 46.0);
    }

    #[test]
    fn test_allocation() {
        let config = LayoutConfig::default();
        assert_eq!(allocation(24.0, &config), 108.0);
        assert_eq!(
            allocation(5.0, &config),
            80.0,
            "small bubbles still claim the minimum width"
        );
    }

    #[test]
    fn test_bubble_anchors() {
        let bubble = Bubble {
            id: CladeNodeId(0),
            x: 100.0,
            y: 50.0,
            radius: 20.0,
            collapsed: false,
        };
        assert_eq!(bubble.top(), (100.0, 30.0));
        assert_eq!(bubble.bottom(), (100.0, 70.0));
        assert_eq!(bubble.bounds(), ([80.0, 30.0], [120.0, 70.0]));
    }
}
