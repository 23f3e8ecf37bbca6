//! Stick-figure silhouettes grown from an organism's genes.
//!
//! Every gene adds one line segment to each symmetry arm. A segment starts
//! either at the organism's centre or at the end of an earlier segment of
//! the same arm, selected by the gene's branch index.

use std::f64::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use super::color::Rgb;

const ROOT: (f64, f64) = (0.0, 0.0);

/// One growth instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Rotation in radians relative to the segment's base direction.
    pub rotation: f64,
    /// Segment length in pixels.
    pub length: f64,
    /// Attachment point: 0 is the centre, `n` is the end of the n-th segment.
    pub branch: i64,
    pub color: Rgb,
}

/// A drawn segment. Endpoints are snapped to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub origin: (f64, f64),
    pub destination: (f64, f64),
    pub rotation: f64,
    pub color: Rgb,
}

impl Segment {
    fn new(origin: (f64, f64), length: f64, rotation: f64, color: Rgb) -> Self {
        let destination = (
            (origin.0 + length * rotation.cos()).round_ties_even(),
            (origin.1 + length * rotation.sin()).round_ties_even(),
        );
        Self {
            origin,
            destination,
            rotation,
            color,
        }
    }

    /// Endpoints translated by `offset`.
    pub fn offset_by(&self, offset: (f64, f64)) -> [(f64, f64); 2] {
        [
            (self.origin.0 + offset.0, self.origin.1 + offset.1),
            (self.destination.0 + offset.0, self.destination.1 + offset.1),
        ]
    }
}

/// The full silhouette: one segment list per symmetry arm.
#[derive(Debug, Clone)]
pub struct SegmentTree {
    arms: Vec<Vec<Segment>>,
    mirror: bool,
}

impl SegmentTree {
    /// Grow the silhouette for the given genes.
    pub fn grow(genes: &[Gene], symmetry: u32, mirror: bool) -> Self {
        let arm_count = symmetry.max(1) as usize;
        let mut tree = Self {
            arms: vec![Vec::with_capacity(genes.len()); arm_count],
            mirror,
        };
        for gene in genes {
            tree.add_segment(gene);
        }
        tree
    }

    fn add_segment(&mut self, gene: &Gene) {
        let symmetry = self.arms.len();
        let mirror = self.mirror;
        let anchors = self.arms[0].len() + 1;
        let branch = usize::try_from(gene.branch)
            .ok()
            .filter(|&b| b < anchors)
            .unwrap_or(anchors - 1);

        for (num, arm) in self.arms.iter_mut().enumerate() {
            let mirrored = mirror && num % 2 == 1;

            let (origin, base_rotation) = match branch.checked_sub(1) {
                None => {
                    let period = if mirrored { num as f64 - 1.0 } else { num as f64 };
                    let rotation = TAU / symmetry as f64 * period;
                    (ROOT, if mirrored { PI - rotation } else { rotation })
                }
                // Off-centre segments inherit the arm's latest heading.
                Some(parent) => (
                    arm[parent].destination,
                    arm.last().map_or(0.0, |segment| segment.rotation),
                ),
            };

            let rotation = if mirrored {
                base_rotation - gene.rotation
            } else {
                base_rotation + gene.rotation
            };
            arm.push(Segment::new(origin, gene.length, rotation, gene.color));
        }
    }

    pub fn symmetry(&self) -> usize {
        self.arms.len()
    }

    /// Every segment, arm by arm.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.arms.iter().flatten()
    }

    /// Distance from the centre to the farthest segment end.
    pub fn radius(&self) -> f64 {
        self.segments()
            .map(|segment| segment.destination.0.hypot(segment.destination.1))
            .fold(0.0, f64::max)
    }
}
