//! Diagram configuration.
//!
//! Settings live in an INI file with one section per pipeline stage
//! (`[tree]`, `[layout]`, `[render]`, `[batch]`). Every key is optional and
//! falls back to the defaults below. Environment variables of the form
//! `CLADE_<SECTION>__<KEY>` override the file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::geometry::Rgb;

/// Depth limit when scanning descendant generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum DeadZone {
    /// Scan every descendant generation.
    #[default]
    Unbounded,
    /// Scan at most this many descendant generations.
    Generations(usize),
}

impl DeadZone {
    /// `None` when unbounded.
    pub fn limit(self) -> Option<usize> {
        match self {
            DeadZone::Unbounded => None,
            DeadZone::Generations(n) => Some(n),
        }
    }
}

impl From<i64> for DeadZone {
    /// Negative values mean unbounded.
    fn from(value: i64) -> Self {
        usize::try_from(value).map_or(DeadZone::Unbounded, DeadZone::Generations)
    }
}

impl From<DeadZone> for i64 {
    fn from(zone: DeadZone) -> Self {
        match zone {
            DeadZone::Unbounded => -1,
            DeadZone::Generations(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

/// Tree construction and pruning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Minimum population for a lineage (or one of its descendant
    /// generations) to be drawn.
    pub population_threshold: u32,
    /// How many descendant generations the inclusion filter looks ahead.
    pub extinction_dead_zone: DeadZone,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            population_threshold: 10,
            extinction_dead_zone: DeadZone::Unbounded,
        }
    }
}

/// Spacing of bubbles and generation rows, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Blank border around the diagram.
    pub edge_margin: f32,
    /// Added to a silhouette's radius to get its bubble radius.
    pub node_padding: f32,
    pub node_min_radius: f32,
    /// Horizontal gap after a bubble.
    pub species_margin: f32,
    /// Minimum horizontal allocation of a bubble.
    pub species_min_width: f32,
    /// Vertical gap between generation rows.
    pub generation_margin: f32,
    pub generation_min_height: f32,
    /// Extra descendant generations inspected when avoiding earlier
    /// subtrees. Independent from the extinction dead zone.
    pub placement_dead_zone: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            edge_margin: 25.0,
            node_padding: 14.0,
            node_min_radius: 24.0,
            species_margin: 60.0,
            species_min_width: 80.0,
            generation_margin: 150.0,
            generation_min_height: 160.0,
            placement_dead_zone: 0,
        }
    }
}

/// Colors, line styles and output encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub diagram_line_color: Rgb,
    pub diagram_line_thickness: u32,
    /// Image background, also used to fill bubbles.
    pub background_color: Rgb,
    pub generation_lines_enabled: bool,
    pub generation_line_color: Rgb,
    pub generation_line_thickness: u32,
    /// Output file extension; selects the image encoding.
    pub file_type: String,
    /// Height in pixels of the bands the image is painted in.
    pub frame_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            diagram_line_color: Rgb(169, 169, 169),
            diagram_line_thickness: 3,
            background_color: Rgb(0, 0, 0),
            generation_lines_enabled: true,
            generation_line_color: Rgb(37, 63, 63),
            generation_line_thickness: 1,
            file_type: "png".to_string(),
            frame_height: 2048,
        }
    }
}

/// Which generations go into which image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Index of the first generation to draw.
    pub clade_start: usize,
    /// Index one past the last generation to draw; all when unset.
    pub clade_end: Option<usize>,
    /// Generations per image; 0 draws everything into one image.
    pub clade_split_interval: usize,
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CladeConfig {
    pub tree: TreeConfig,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub batch: BatchConfig,
}

impl CladeConfig {
    /// Load from an optional INI file plus `CLADE_*` environment overrides.
    ///
    /// A missing file is not an error; every key has a default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "reading configuration");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Ini)
                    .required(false),
            );
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("CLADE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
