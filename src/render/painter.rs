//! Diagram painting.
//!
//! The image is painted in horizontal frames. For each frame the spatial
//! index yields the primitives touching it, in draw order: generation
//! dividers, then connectors, then bubbles. Lines are clipped to the frame;
//! bubbles are drawn whole.

use std::ops::Range;

use tracing::{debug, info};

use super::canvas::Rasterizer;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::layout::{Bubble, Diagram};
use crate::spatial::{Primitive, SpatialIndex};

/// Paint `diagram` onto `canvas`.
pub fn paint<R: Rasterizer>(diagram: &Diagram, config: &RenderConfig, canvas: &mut R) -> Result<()> {
    let (_, height) = canvas.size();
    let index = SpatialIndex::for_diagram(diagram, config);
    let frame_height = config.frame_height.max(1);
    let reach = config
        .diagram_line_thickness
        .max(config.generation_line_thickness) as f32;

    info!(
        height,
        frame_height,
        primitives = index.len(),
        "painting diagram"
    );

    let mut painter = Painter {
        diagram,
        config,
        canvas,
        bubbles_drawn: 0,
    };

    let mut top = 0;
    while top < height {
        let bottom = top.saturating_add(frame_height).min(height);
        painter.canvas.begin_frame(top..bottom)?;

        let clip = (top as f32 - reach)..(bottom as f32 + reach);
        for footprint in index.in_band(clip.start, clip.end) {
            match footprint.primitive {
                Primitive::Divider { generation } => painter.divider(generation, &clip)?,
                Primitive::Connector { parent, child } => {
                    let path = diagram.connector(parent, child).path;
                    painter.clipped_path(&path, &clip)?;
                }
                Primitive::Bubble { id } => painter.bubble(diagram.bubble(id))?,
            }
        }

        debug!(top, bottom, "painted frame");
        top = bottom;
    }
    Ok(())
}

struct Painter<'a, R> {
    diagram: &'a Diagram,
    config: &'a RenderConfig,
    canvas: &'a mut R,
    bubbles_drawn: usize,
}

impl<R: Rasterizer> Painter<'_, R> {
    fn divider(&mut self, generation: usize, clip: &Range<f32>) -> Result<()> {
        let y = self.diagram.row_y(generation);
        if !clip.contains(&y) {
            return Ok(());
        }
        let y = pixel(y);
        let right = pixel(self.diagram.width());
        self.canvas.draw_line(
            &[(0, y), (right, y)],
            self.config.generation_line_color,
            self.config.generation_line_thickness,
        )
    }

    /// Draw the parts of an axis-aligned polyline that fall inside `clip`.
    fn clipped_path(&mut self, path: &[(f32, f32)], clip: &Range<f32>) -> Result<()> {
        for segment in path.windows(2) {
            let ((x0, y0), (x1, y1)) = (segment[0], segment[1]);
            let (low, high) = (y0.min(y1), y0.max(y1));
            if high < clip.start || low > clip.end {
                continue;
            }
            let clamp = |y: f32| y.clamp(clip.start, clip.end);
            self.canvas.draw_line(
                &[(pixel(x0), pixel(clamp(y0))), (pixel(x1), pixel(clamp(y1)))],
                self.config.diagram_line_color,
                self.config.diagram_line_thickness,
            )?;
        }
        Ok(())
    }

    fn bubble(&mut self, bubble: &Bubble) -> Result<()> {
        self.bubbles_drawn += 1;
        if self.bubbles_drawn % 100 == 0 {
            debug!(drawn = self.bubbles_drawn, "drawing bubbles");
        }

        let line = self.config.diagram_line_color;
        let thickness = self.config.diagram_line_thickness;

        if bubble.collapsed {
            let (bx, by) = bubble.bottom();
            let (tx, ty) = bubble.top();
            return self.canvas.draw_line(
                &[(pixel(bx), pixel(by)), (pixel(tx), pixel(ty))],
                line,
                thickness,
            );
        }

        let center = (pixel(bubble.x), pixel(bubble.y));
        self.canvas.draw_circle(
            center,
            bubble.radius.round() as u32,
            line,
            self.config.background_color,
            thickness,
        )?;

        let silhouette = self.diagram.tree().representative(bubble.id).silhouette();
        let offset = (f64::from(bubble.x), f64::from(bubble.y));
        for segment in silhouette.segments() {
            let [(x0, y0), (x1, y1)] = segment.offset_by(offset);
            self.canvas.draw_line(
                &[
                    (x0.round() as i32, y0.round() as i32),
                    (x1.round() as i32, y1.round() as i32),
                ],
                segment.color,
                1,
            )?;
        }
        Ok(())
    }
}

fn pixel(value: f32) -> i32 {
    value.round() as i32
}
