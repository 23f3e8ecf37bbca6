//! Clade Diagram
//!
//! Reconstructs a phylogenetic tree from periodic population snapshots of an
//! evolution simulation and draws it as a layered bubble diagram: one row per
//! snapshot, one bubble per surviving lineage, connectors from each bubble to
//! its closest recorded ancestor.
//!
//! # Architecture
//!
//! - `lineage`: lineage identifiers, variants and per-snapshot censuses
//! - `tree`: clade tree construction, pruning and sibling ordering
//! - `layout`: bubble radii, row heights and horizontal placement
//! - `spatial`: R-tree over drawing primitives for banded rendering and hit testing
//! - `render`: rasterization of a laid-out diagram
//! - `loader`: save directories, JSON and binary snapshots and the census cache
//! - `batch`: rendering a window of generations into one or more images
//!
//! The same pipeline is exposed to JavaScript through [`CladeDiagramWasm`].

use js_sys::{Float32Array, Uint32Array, Uint8Array};
use wasm_bindgen::prelude::*;

pub mod batch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod lineage;
pub mod loader;
pub mod render;
pub mod spatial;
pub mod tree;

#[cfg(test)]
mod testing;

pub use config::CladeConfig;
pub use error::{CladeError, Result};
pub use layout::Diagram;
pub use tree::{CladeNodeId, CladeTree};

use lineage::{Census, CensusRecord};
use spatial::SpatialIndex;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Sentinel in `parents()` for nodes without a parent.
pub const NO_PARENT: u32 = u32::MAX;

/// A laid-out clade diagram, exposed to JavaScript.
///
/// Built once from census records; node ids index every flat array
/// returned below.
#[wasm_bindgen]
pub struct CladeDiagramWasm {
    diagram: Diagram,
    config: CladeConfig,
    index: SpatialIndex,
}

impl CladeDiagramWasm {
    /// Build, lay out and index the diagram for `records`, in time order.
    pub fn from_records(records: Vec<CensusRecord>, config: CladeConfig) -> Result<Self> {
        let censuses = records
            .into_iter()
            .map(Census::from_record)
            .collect::<Result<Vec<_>>>()?;
        let tree = CladeTree::build(censuses, &config.tree)?;
        let diagram = Diagram::compute(tree, &config.layout)?;
        let index = SpatialIndex::for_diagram(&diagram, &config.render);
        Ok(Self {
            diagram,
            config,
            index,
        })
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// Interleaved `[x0, y0, r0, x1, y1, r1, ...]`.
    fn position_data(&self) -> Vec<f32> {
        self.diagram
            .bubbles()
            .iter()
            .flat_map(|bubble| [bubble.x, bubble.y, bubble.radius])
            .collect()
    }

    fn parent_data(&self) -> Vec<u32> {
        let tree = self.diagram.tree();
        tree.ids()
            .map(|id| tree.parent(id).map_or(NO_PARENT, CladeNodeId::raw))
            .collect()
    }

    fn generation_data(&self) -> Vec<u32> {
        let tree = self.diagram.tree();
        tree.ids()
            .map(|id| tree.node(id).generation as u32)
            .collect()
    }

    fn collapsed_data(&self) -> Vec<u8> {
        self.diagram
            .bubbles()
            .iter()
            .map(|bubble| u8::from(bubble.collapsed))
            .collect()
    }

    fn node_at(&self, x: f32, y: f32) -> Option<u32> {
        self.index.bubble_at(x, y).map(CladeNodeId::raw)
    }

    fn lineage_of(&self, node_id: u32) -> Option<String> {
        let tree = self.diagram.tree();
        ((node_id as usize) < tree.node_count())
            .then(|| tree.lineage(CladeNodeId(node_id)).id().to_string())
    }

    fn pixels(&self) -> Result<Vec<u8>> {
        let canvas = render::render(&self.diagram, &self.config.render)?;
        Ok(canvas.into_image()?.into_raw())
    }
}

#[wasm_bindgen]
impl CladeDiagramWasm {
    /// Build a diagram from an array of census records
    /// (`{time, species: [{clade, subspecies}]}`), ordered by time.
    ///
    /// `config` may be `undefined` for defaults, or an object with any of the
    /// `tree`, `layout` and `render` sections.
    #[wasm_bindgen(constructor)]
    pub fn new(censuses: JsValue, config: JsValue) -> std::result::Result<CladeDiagramWasm, JsError> {
        let records: Vec<CensusRecord> = serde_wasm_bindgen::from_value(censuses)?;
        let config: CladeConfig = if config.is_undefined() || config.is_null() {
            CladeConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Ok(Self::from_records(records, config)?)
    }

    // =========================================================================
    // Dimensions
    // =========================================================================

    #[wasm_bindgen(js_name = nodeCount)]
    pub fn node_count(&self) -> u32 {
        self.diagram.tree().node_count() as u32
    }

    #[wasm_bindgen(js_name = generationCount)]
    pub fn generation_count(&self) -> u32 {
        self.diagram.tree().generation_count() as u32
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.diagram.pixel_size().0
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.diagram.pixel_size().1
    }

    // =========================================================================
    // Node Data
    // =========================================================================

    /// Bubble centers and radii as `[x0, y0, r0, x1, y1, r1, ...]`.
    #[wasm_bindgen(js_name = getPositions)]
    pub fn get_positions(&self) -> Float32Array {
        Float32Array::from(&self.position_data()[..])
    }

    /// Parent id per node; `0xFFFFFFFF` for roots.
    #[wasm_bindgen(js_name = getParents)]
    pub fn get_parents(&self) -> Uint32Array {
        Uint32Array::from(&self.parent_data()[..])
    }

    /// Generation (row) index per node.
    #[wasm_bindgen(js_name = getGenerations)]
    pub fn get_generations(&self) -> Uint32Array {
        Uint32Array::from(&self.generation_data()[..])
    }

    /// 1 where the node is drawn as a straight run instead of a bubble.
    #[wasm_bindgen(js_name = getCollapsed)]
    pub fn get_collapsed(&self) -> Uint8Array {
        Uint8Array::from(&self.collapsed_data()[..])
    }

    /// Lineage identifier of a node.
    #[wasm_bindgen(js_name = getLineage)]
    pub fn get_lineage(&self, node_id: u32) -> Option<String> {
        self.lineage_of(node_id)
    }

    /// Y coordinate of a generation's row.
    #[wasm_bindgen(js_name = getRowY)]
    pub fn get_row_y(&self, generation: u32) -> Option<f32> {
        let generation = generation as usize;
        (generation < self.diagram.tree().generation_count()).then(|| self.diagram.row_y(generation))
    }

    // =========================================================================
    // Hit Testing
    // =========================================================================

    /// Node whose bubble contains the point.
    #[wasm_bindgen(js_name = findNodeAt)]
    pub fn find_node_at(&self, x: f32, y: f32) -> Option<u32> {
        self.node_at(x, y)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render the diagram to packed RGB bytes, `width * height * 3` long.
    #[wasm_bindgen(js_name = renderPixels)]
    pub fn render_pixels(&self) -> std::result::Result<Vec<u8>, JsError> {
        Ok(self.pixels()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::census;

    fn records(censuses: &[Census]) -> Vec<CensusRecord> {
        censuses.iter().map(Census::to_record).collect()
    }

    fn sample() -> CladeDiagramWasm {
        let censuses = [
            census(0, &[("1", 20)]),
            census(1, &[("1", 20), ("1a", 15)]),
            census(2, &[("1a", 15), ("1b", 12)]),
        ];
        CladeDiagramWasm::from_records(records(&censuses), CladeConfig::default()).unwrap()
    }

    #[test]
    fn test_flat_arrays_cover_every_node() {
        let diagram = sample();
        let count = diagram.node_count() as usize;
        assert_eq!(count, 5);
        assert_eq!(diagram.generation_count(), 3);
        assert_eq!(diagram.position_data().len(), count * 3);
        assert_eq!(diagram.parent_data().len(), count);
        assert_eq!(diagram.collapsed_data().len(), count);
        assert_eq!(diagram.generation_data(), vec![0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_parents_use_sentinel_for_roots() {
        let diagram = sample();
        let parents = diagram.parent_data();
        assert_eq!(parents[0], NO_PARENT, "first generation has no parents");
        for (child, &parent) in parents.iter().enumerate().skip(1) {
            assert_ne!(parent, NO_PARENT, "node {child} should have a parent");
            let tree = diagram.diagram().tree();
            assert_eq!(
                tree.node(CladeNodeId(parent)).generation + 1,
                tree.node(CladeNodeId(child as u32)).generation,
            );
        }
    }

    #[test]
    fn test_find_node_at_bubble_center() {
        let diagram = sample();
        let bubble = diagram.diagram().bubbles()[0];
        assert_eq!(diagram.node_at(bubble.x, bubble.y), Some(0));
        assert_eq!(diagram.node_at(-100.0, -100.0), None);
        assert_eq!(diagram.lineage_of(0).as_deref(), Some("1"));
        assert_eq!(diagram.lineage_of(99), None);
    }

    #[test]
    fn test_render_pixels_size() {
        let diagram = sample();
        let pixels = diagram.pixels().unwrap();
        assert_eq!(pixels.len(), (diagram.width() * diagram.height() * 3) as usize);
    }

    #[test]
    fn test_empty_records_fail() {
        let result = CladeDiagramWasm::from_records(Vec::new(), CladeConfig::default());
        assert!(matches!(result, Err(CladeError::NoGenerations)));
    }
}
