//! Save files, JSON or binary.
//!
//! The simulation writes field names with leading underscores (`_organisms`,
//! `__geneticCode`, ...). They are stripped before the document is mapped
//! onto the records below. Binary saves are Java object streams, decoded by
//! [`super::serialized`] into the same document shape.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{CladeError, Result};
use crate::geometry::{Gene, Rgb};
use crate::lineage::{build_census, Census, OrganismAttributes, Variant};

use super::serialized;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveFile {
    organisms: Vec<OrganismRecord>,
    world_statistics: WorldStatistics,
}

#[derive(Debug, Deserialize)]
struct WorldStatistics {
    time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganismRecord {
    #[serde(deserialize_with = "truthy")]
    alive: bool,
    genetic_code: GeneticCode,
}

#[derive(Debug, Deserialize)]
struct GeneticCode {
    #[serde(rename = "cladeID")]
    clade_id: String,
    symmetry: u32,
    #[serde(deserialize_with = "truthy")]
    mirror: bool,
    genes: Vec<GeneRecord>,
}

#[derive(Debug, Deserialize)]
struct GeneRecord {
    theta: f64,
    length: f64,
    branch: i64,
    color: ColorRecord,
}

#[derive(Debug, Deserialize)]
struct ColorRecord {
    value: i64,
}

/// Accept booleans as well as 0/1 integers.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
        other => Err(serde::de::Error::custom(format!(
            "expected a boolean, found {other}"
        ))),
    }
}

/// Rename `_key` to `key` throughout `value`, unless the object already
/// has a field with the stripped name.
pub fn strip_key_underscores(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in &keys {
                let stripped = key.trim_start_matches('_');
                if stripped != key && !keys.iter().any(|k| k == stripped) {
                    if let Some(inner) = map.remove(key) {
                        map.insert(stripped.to_string(), inner);
                    }
                }
            }
            map.values_mut().for_each(strip_key_underscores);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_key_underscores),
        _ => {}
    }
}

impl GeneticCode {
    /// Genes as drawn. The first gene's rotation only matters when the
    /// organism is mirrored with several arms, or when a later gene grows
    /// from the root as well; otherwise it is reset to zero.
    fn genes(&self) -> Result<Vec<Gene>> {
        let mut genes = self
            .genes
            .iter()
            .map(|gene| {
                Ok(Gene {
                    rotation: gene.theta,
                    length: gene.length,
                    branch: gene.branch,
                    color: Rgb::from_packed(gene.color.value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mirrored_arms = self.mirror && self.symmetry > 1;
        let shares_root = genes.iter().skip(1).any(|gene| gene.branch == 0);
        if !mirrored_arms && !shares_root {
            if let Some(first) = genes.first_mut() {
                first.rotation = 0.0;
            }
        }
        Ok(genes)
    }
}

/// Parse a JSON save into its organisms and snapshot time.
pub fn parse_save(path: &Path, text: &str) -> Result<(Vec<OrganismAttributes>, i64)> {
    let mut document: Value = serde_json::from_str(text)?;
    strip_key_underscores(&mut document);
    parse_document(path, document)
}

/// Parse a binary save. Its organisms sit in the `list` of a wrapper
/// object rather than directly under `organisms`.
pub fn parse_binary_save<R: Read>(path: &Path, input: R) -> Result<(Vec<OrganismAttributes>, i64)> {
    let mut document = serialized::read_stream(input).map_err(|e| CladeError::InvalidSnapshot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    strip_key_underscores(&mut document);

    if let Some(organisms) = document.get_mut("organisms") {
        if let Some(list) = organisms.get_mut("list").map(Value::take) {
            *organisms = list;
        }
    }
    parse_document(path, document)
}

fn parse_document(path: &Path, document: Value) -> Result<(Vec<OrganismAttributes>, i64)> {
    let save: SaveFile =
        serde_json::from_value(document).map_err(|e| CladeError::InvalidSnapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let organisms = save
        .organisms
        .into_iter()
        .map(|organism| {
            let code = organism.genetic_code;
            Ok(OrganismAttributes {
                alive: organism.alive,
                variant: Variant::new(code.genes()?, code.symmetry, code.mirror),
                lineage: code.clade_id,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((organisms, save.world_statistics.time))
}

/// Read a JSON save and take its census.
pub fn read_save(path: &Path) -> Result<Census> {
    debug!(path = %path.display(), "reading save");
    let text = fs::read_to_string(path)?;
    let (organisms, time) = parse_save(path, &text)?;
    build_census(organisms, time)
}

/// Read a binary save and take its census.
pub fn read_binary_save(path: &Path) -> Result<Census> {
    debug!(path = %path.display(), "reading binary save");
    let input = BufReader::new(File::open(path)?);
    let (organisms, time) = parse_binary_save(path, input)?;
    build_census(organisms, time)
}
