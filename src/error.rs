//! Error type shared by every stage of the pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::tree::CladeNodeId;

/// Errors produced while loading snapshots, building the clade tree,
/// laying it out, or rendering it.
#[derive(Debug, Error)]
pub enum CladeError {
    /// A lineage identifier did not match `(prefix:)?<root><hex path>`.
    #[error("malformed lineage identifier {0:?}")]
    MalformedIdentifier(String),

    /// The diagram was asked to cover zero generations.
    #[error("a clade diagram needs at least one generation")]
    NoGenerations,

    /// The output raster could not be allocated.
    #[error(
        "not enough memory for a {width}x{height} image; render fewer generations per batch"
    )]
    OutOfMemory { width: u32, height: u32 },

    /// Horizontal placement of a node ended up depending on itself.
    #[error("placement of {0} depends on its own position")]
    PlacementCycle(CladeNodeId),

    /// A lineage record carried no variants.
    #[error("lineage {0:?} has no recorded variants")]
    EmptyLineage(String),

    /// A color could not be parsed.
    #[error("invalid color {0:?}")]
    InvalidColor(String),

    /// A save file could not be decoded into the expected shape.
    #[error("invalid snapshot {}: {reason}", path.display())]
    InvalidSnapshot { path: PathBuf, reason: String },

    /// The rasterizer rejected a drawing primitive.
    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CladeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_message_mentions_batches() {
        let err = CladeError::OutOfMemory {
            width: 10,
            height: 20,
        };
        let message = err.to_string();
        assert!(message.contains("10x20"), "got {message}");
        assert!(message.contains("fewer generations"), "got {message}");
    }

    #[test]
    fn test_placement_cycle_names_node() {
        let err = CladeError::PlacementCycle(CladeNodeId(7));
        assert_eq!(err.to_string(), "placement of Clade(7) depends on its own position");
    }
}
