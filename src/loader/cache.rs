//! Census cache.
//!
//! Aggregating a large save is slow, so each census is written to
//! `clade/.cache/<save stem>.json` the first time its save is read.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::lineage::{Census, CensusRecord};

/// Cache entry path for a save file with the given stem.
pub fn entry_path(cache_dir: &Path, stem: &str) -> PathBuf {
    cache_dir.join(format!("{stem}.json"))
}

pub fn read_entry(path: &Path) -> Result<Census> {
    let text = fs::read_to_string(path)?;
    let record: CensusRecord = serde_json::from_str(&text)?;
    debug!(path = %path.display(), time = record.time, "loaded census from cache");
    Census::from_record(record)
}

pub fn write_entry(path: &Path, census: &Census) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, &census.to_record())?;
    writer.flush()?;
    debug!(path = %path.display(), "cached census");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::census;

    #[test]
    fn test_entry_path() {
        assert_eq!(
            entry_path(Path::new("c"), "world@12"),
            Path::new("c").join("world@12.json")
        );
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = entry_path(dir.path(), "world@5");
        write_entry(&path, &census(5, &[("1", 3), ("1a", 7)])).unwrap();

        let restored = read_entry(&path).unwrap();
        assert_eq!(restored.time(), 5);
        assert_eq!(restored.get("1a").map(|l| l.population()), Some(7));
        let order: Vec<&str> = restored.lineages().iter().map(|l| l.id().as_str()).collect();
        assert_eq!(order, vec!["1", "1a"], "lineage order survives the cache");
    }
}
