//! Variants, subspecies and lineages.
//!
//! A lineage ("species") groups every living organism that carries the same
//! identifier in one snapshot. Within it, organisms with identical shape
//! collapse into one variant ("subspecies") with a population count.

use serde::{Deserialize, Serialize};

use super::id::LineageId;
use crate::error::{CladeError, Result};
use crate::geometry::{Gene, SegmentTree};

/// A concrete phenotype.
///
/// Two variants are equal when their shape-defining attributes match
/// exactly. The bounding radius is derived from those attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "VariantRecord", into = "VariantRecord")]
pub struct Variant {
    genes: Vec<Gene>,
    symmetry: u32,
    mirror: bool,
    radius: f64,
}

#[derive(Serialize, Deserialize)]
struct VariantRecord {
    genes: Vec<Gene>,
    symmetry: u32,
    mirror: bool,
}

impl Variant {
    pub fn new(genes: Vec<Gene>, symmetry: u32, mirror: bool) -> Self {
        let radius = SegmentTree::grow(&genes, symmetry, mirror).radius();
        Self {
            genes,
            symmetry,
            mirror,
            radius,
        }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn symmetry(&self) -> u32 {
        self.symmetry
    }

    pub fn mirror(&self) -> bool {
        self.mirror
    }

    /// Bounding radius of the silhouette.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Grow the drawable silhouette.
    pub fn silhouette(&self) -> SegmentTree {
        SegmentTree::grow(&self.genes, self.symmetry, self.mirror)
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.symmetry == other.symmetry && self.mirror == other.mirror && self.genes == other.genes
    }
}

impl From<VariantRecord> for Variant {
    fn from(record: VariantRecord) -> Self {
        Self::new(record.genes, record.symmetry, record.mirror)
    }
}

impl From<Variant> for VariantRecord {
    fn from(variant: Variant) -> Self {
        Self {
            genes: variant.genes,
            symmetry: variant.symmetry,
            mirror: variant.mirror,
        }
    }
}

/// A variant with its population count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subspecies {
    pub representative: Variant,
    pub population: u32,
}

/// All organisms of one snapshot that share a lineage identifier.
#[derive(Debug, Clone)]
pub struct Lineage {
    id: LineageId,
    /// First-encountered order; ranking happens on read.
    subspecies: Vec<Subspecies>,
}

impl Lineage {
    /// Start a lineage from its first organism.
    pub fn founded(id: LineageId, variant: Variant) -> Self {
        Self {
            id,
            subspecies: vec![Subspecies {
                representative: variant,
                population: 1,
            }],
        }
    }

    /// Rebuild a lineage from stored subspecies.
    pub fn from_subspecies(id: LineageId, subspecies: Vec<Subspecies>) -> Result<Self> {
        if subspecies.is_empty() {
            return Err(CladeError::EmptyLineage(id.to_string()));
        }
        Ok(Self { id, subspecies })
    }

    pub fn id(&self) -> &LineageId {
        &self.id
    }

    /// Count one more organism of the given shape.
    pub fn tally(&mut self, variant: Variant) {
        self.tally_many(variant, 1);
    }

    /// Count `count` organisms of the given shape.
    pub fn tally_many(&mut self, variant: Variant, count: u32) {
        match self
            .subspecies
            .iter_mut()
            .find(|existing| existing.representative == variant)
        {
            Some(existing) => existing.population += count,
            None => self.subspecies.push(Subspecies {
                representative: variant,
                population: count,
            }),
        }
    }

    /// Subspecies by descending population, ties in first-encountered order.
    pub fn ranked(&self) -> Vec<&Subspecies> {
        let mut ranked: Vec<&Subspecies> = self.subspecies.iter().collect();
        ranked.sort_by(|a, b| b.population.cmp(&a.population));
        ranked
    }

    /// The most populous variant.
    pub fn representative(&self) -> &Variant {
        let mut best = &self.subspecies[0];
        for candidate in &self.subspecies[1..] {
            if candidate.population > best.population {
                best = candidate;
            }
        }
        &best.representative
    }

    /// Total organisms across all variants.
    pub fn population(&self) -> u32 {
        self.subspecies.iter().map(|s| s.population).sum()
    }

    pub fn subspecies_count(&self) -> usize {
        self.subspecies.len()
    }
}
