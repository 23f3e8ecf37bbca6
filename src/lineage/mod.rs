//! Lineages and the per-snapshot census that groups organisms into them.
//!
//! - `id`: hierarchical lineage identifiers and ancestry queries
//! - `species`: variants, subspecies and lineages
//! - `census`: aggregation of one snapshot's organisms

mod census;
mod id;
mod species;

pub use census::{build_census, Census, CensusRecord, LineageRecord, OrganismAttributes};
pub use id::LineageId;
pub use species::{Lineage, Subspecies, Variant};
