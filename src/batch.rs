//! Batch rendering of a save directory.
//!
//! A run selects a window of generations and renders it either as a single
//! image or, with a split interval, as consecutive images of that many
//! generations each.

use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{BatchConfig, CladeConfig};
use crate::error::{CladeError, Result};
use crate::layout::Diagram;
use crate::lineage::Census;
use crate::loader::{load_censuses, SaveDirectory};
use crate::render::render_to_file;
use crate::tree::CladeTree;

/// One image to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Indices into the time-ordered censuses.
    pub generations: Range<usize>,
    pub output: PathBuf,
}

/// Clamp the configured window to `total` generations.
pub fn generation_window(total: usize, config: &BatchConfig) -> Range<usize> {
    let start = config.clade_start.min(total);
    let end = config.clade_end.unwrap_or(total).clamp(start, total);
    start..end
}

/// Split the configured window into batches.
///
/// Without a split interval the whole window goes to `single_output`.
/// Otherwise each chunk is written to
/// `export_dir/clade_<first>-<last>.<file_type>`, with inclusive
/// generation indices.
pub fn plan(
    total: usize,
    config: &BatchConfig,
    file_type: &str,
    single_output: &Path,
    export_dir: &Path,
) -> Result<Vec<Batch>> {
    let window = generation_window(total, config);
    if window.is_empty() {
        return Err(CladeError::NoGenerations);
    }

    if config.clade_split_interval == 0 {
        return Ok(vec![Batch {
            generations: window,
            output: single_output.to_path_buf(),
        }]);
    }

    let batches = window
        .clone()
        .step_by(config.clade_split_interval)
        .map(|first| {
            let end = (first + config.clade_split_interval).min(window.end);
            Batch {
                generations: first..end,
                output: export_dir.join(format!("clade_{first}-{}.{file_type}", end - 1)),
            }
        })
        .collect();
    Ok(batches)
}

/// Build, lay out and render one batch.
///
/// A batch whose range is empty or reaches past `censuses` fails with
/// [`CladeError::NoGenerations`].
pub fn render_batch(censuses: &[Census], batch: &Batch, config: &CladeConfig) -> Result<()> {
    let window = match censuses.get(batch.generations.clone()) {
        Some(window) if !window.is_empty() => window,
        _ => return Err(CladeError::NoGenerations),
    };
    info!(
        first = batch.generations.start,
        last = batch.generations.end - 1,
        output = %batch.output.display(),
        "rendering batch"
    );
    let tree = CladeTree::build(window.to_vec(), &config.tree)?;
    let diagram = Diagram::compute(tree, &config.layout)?;
    render_to_file(&diagram, &config.render, &batch.output)
}

/// Load every snapshot of `saves` and render all batches. Returns the
/// written image paths.
///
/// `output` replaces the default single image path `<saves>/clade.<ext>`.
pub fn run(saves: &SaveDirectory, config: &CladeConfig, output: Option<&Path>) -> Result<Vec<PathBuf>> {
    let censuses = load_censuses(saves)?;

    let single_output = match output {
        Some(path) => path.to_path_buf(),
        None => saves
            .root()
            .join(format!("clade.{}", config.render.file_type)),
    };
    let export_dir = if config.batch.clade_split_interval > 0 {
        saves.export_dir()?
    } else {
        saves.root().to_path_buf()
    };

    let batches = plan(
        censuses.len(),
        &config.batch,
        &config.render.file_type,
        &single_output,
        &export_dir,
    )?;
    info!(batches = batches.len(), "planned batches");

    let mut written = Vec::with_capacity(batches.len());
    for batch in &batches {
        render_batch(&censuses, batch, config)?;
        written.push(batch.output.clone());
    }
    Ok(written)
}
