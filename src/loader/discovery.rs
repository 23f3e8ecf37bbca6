//! Finding and loading every snapshot of a save directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use super::cache;
use super::paths::SaveDirectory;
use super::snapshot;
use crate::error::Result;
use crate::lineage::Census;

/// Where a snapshot's census comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// A census record in the cache directory.
    Cached(PathBuf),
    /// A JSON save (`name@time.json`).
    Json(PathBuf),
    /// A serialized Java save (`name@time.bgw`).
    Binary(PathBuf),
}

impl SnapshotSource {
    pub fn path(&self) -> &Path {
        match self {
            SnapshotSource::Cached(path)
            | SnapshotSource::Json(path)
            | SnapshotSource::Binary(path) => path,
        }
    }

    /// File name without extension; identifies the snapshot across sources.
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Load the census, caching it when it came from a save.
    pub fn load(&self, cache_dir: &Path) -> Result<Census> {
        let census = match self {
            SnapshotSource::Cached(path) => return cache::read_entry(path),
            SnapshotSource::Json(path) => snapshot::read_save(path)?,
            SnapshotSource::Binary(path) => snapshot::read_binary_save(path)?,
        };
        cache::write_entry(&cache::entry_path(cache_dir, &self.stem()), &census)?;
        Ok(census)
    }
}

/// Matches in `dir` for `pattern`, sorted by path.
fn matching(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths = glob::glob(&format!("{escaped}/{pattern}"))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(std::io::Error::from)?;
    paths.sort();
    Ok(paths)
}

/// Classify the snapshots of `saves`: cache entries first, then JSON saves,
/// then binary saves. A stem is claimed by the first source found.
pub fn discover(saves: &SaveDirectory) -> Result<Vec<SnapshotSource>> {
    let cache_dir = saves.cache_dir()?;
    let kinds: [(&Path, &str, fn(PathBuf) -> SnapshotSource); 3] = [
        (cache_dir.as_path(), "*.json", SnapshotSource::Cached),
        (saves.root(), "*@*.json", SnapshotSource::Json),
        (saves.root(), "*@*.bgw", SnapshotSource::Binary),
    ];

    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for (dir, pattern, kind) in kinds {
        for path in matching(dir, pattern)? {
            let source = kind(path);
            if seen.insert(source.stem()) {
                sources.push(source);
            }
        }
    }
    Ok(sources)
}

/// Load every snapshot of `saves`, ordered by time.
pub fn load_censuses(saves: &SaveDirectory) -> Result<Vec<Census>> {
    let cache_dir = saves.cache_dir()?;
    let sources = discover(saves)?;
    info!(snapshots = sources.len(), "loading snapshots");

    let mut censuses = sources
        .iter()
        .map(|source| source.load(&cache_dir))
        .collect::<Result<Vec<_>>>()?;

    censuses.sort_by_key(Census::time);
    info!(generations = censuses.len(), "loaded snapshots");
    Ok(censuses)
}
