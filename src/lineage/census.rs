//! Per-snapshot population census.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::id::LineageId;
use super::species::{Lineage, Subspecies, Variant};
use crate::error::Result;

/// One organism as handed over by the snapshot loader.
#[derive(Debug, Clone)]
pub struct OrganismAttributes {
    pub alive: bool,
    /// Raw lineage identifier string.
    pub lineage: String,
    pub variant: Variant,
}

/// All living lineages of one snapshot.
///
/// Lineages are keyed by their raw identifier string and kept in the order
/// they were first seen.
#[derive(Debug, Clone)]
pub struct Census {
    time: i64,
    lineages: Vec<Lineage>,
    index: HashMap<String, usize>,
}

impl Census {
    /// An empty census taken at `time`.
    pub fn new(time: i64) -> Self {
        Self {
            time,
            lineages: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Snapshot ordinal used to order generations.
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Lineages in first-seen order.
    pub fn lineages(&self) -> &[Lineage] {
        &self.lineages
    }

    /// Look up a lineage by its raw identifier string.
    pub fn get(&self, raw_id: &str) -> Option<&Lineage> {
        self.index.get(raw_id).map(|&i| &self.lineages[i])
    }

    pub fn species_count(&self) -> usize {
        self.lineages.len()
    }

    pub fn population(&self) -> u32 {
        self.lineages.iter().map(Lineage::population).sum()
    }

    /// Count one organism under an already parsed identifier.
    pub fn tally(&mut self, id: LineageId, variant: Variant) {
        match self.index.get(id.as_str()) {
            Some(&i) => self.lineages[i].tally(variant),
            None => {
                self.index.insert(id.as_str().to_string(), self.lineages.len());
                self.lineages.push(Lineage::founded(id, variant));
            }
        }
    }

    /// Insert a fully formed lineage, merging into an existing one with the
    /// same identifier string.
    pub fn insert(&mut self, lineage: Lineage) {
        match self.index.get(lineage.id().as_str()) {
            Some(&i) => {
                for subspecies in lineage.ranked() {
                    self.lineages[i]
                        .tally_many(subspecies.representative.clone(), subspecies.population);
                }
            }
            None => {
                self.index
                    .insert(lineage.id().as_str().to_string(), self.lineages.len());
                self.lineages.push(lineage);
            }
        }
    }

    /// Convert into the cache record form.
    pub fn to_record(&self) -> CensusRecord {
        CensusRecord {
            time: self.time,
            species: self
                .lineages
                .iter()
                .map(|lineage| LineageRecord {
                    clade: lineage.id().as_str().to_string(),
                    subspecies: lineage.ranked().into_iter().cloned().collect(),
                })
                .collect(),
        }
    }

    /// Rebuild a census from its cache record.
    pub fn from_record(record: CensusRecord) -> Result<Self> {
        let mut census = Census::new(record.time);
        for species in record.species {
            let id = LineageId::parse(&species.clade)?;
            census.insert(Lineage::from_subspecies(id, species.subspecies)?);
        }
        Ok(census)
    }
}

/// Serialized census, as stored in the cache directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusRecord {
    pub time: i64,
    pub species: Vec<LineageRecord>,
}

/// Serialized lineage with its subspecies ranked by population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageRecord {
    pub clade: String,
    pub subspecies: Vec<Subspecies>,
}

/// Aggregate one snapshot's organisms into lineages.
///
/// Dead organisms are skipped. A malformed identifier fails the whole
/// snapshot.
pub fn build_census<I>(organisms: I, time: i64) -> Result<Census>
where
    I: IntoIterator<Item = OrganismAttributes>,
{
    let mut census = Census::new(time);
    let mut skipped = 0usize;

    for organism in organisms {
        if !organism.alive {
            skipped += 1;
            continue;
        }
        let id = LineageId::parse(&organism.lineage)?;
        census.tally(id, organism.variant);
    }

    debug!(
        time,
        species = census.species_count(),
        population = census.population(),
        dead = skipped,
        "built census"
    );
    Ok(census)
}
