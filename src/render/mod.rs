//! Rendering of laid out diagrams.
//!
//! - `canvas`: the [`Rasterizer`] seam and the in-memory bitmap behind it
//! - `painter`: frame-by-frame painting of dividers, connectors and bubbles

mod canvas;
mod painter;

use std::path::Path;

use tracing::info;

use crate::config::RenderConfig;
use crate::error::Result;
use crate::layout::Diagram;

pub use canvas::{BitmapCanvas, Rasterizer};
pub use painter::paint;

/// Render `diagram` into a new bitmap.
pub fn render(diagram: &Diagram, config: &RenderConfig) -> Result<BitmapCanvas> {
    let (width, height) = diagram.pixel_size();
    let mut canvas = BitmapCanvas::new(width, height, config.background_color)?;
    paint(diagram, config, &mut canvas)?;
    Ok(canvas)
}

/// Render `diagram` and write it to `path`.
pub fn render_to_file(diagram: &Diagram, config: &RenderConfig, path: &Path) -> Result<()> {
    let canvas = render(diagram, config)?;
    info!(path = %path.display(), "writing image");
    canvas.save(path)
}
