//! Raster targets.
//!
//! Painting goes through the [`Rasterizer`] trait so the diagram painter can
//! be tested without pixels. [`BitmapCanvas`] is the real target: an RGB
//! buffer drawn into with plotters and encoded with the image crate.

use std::ops::Range;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::error::{CladeError, Result};
use crate::geometry::Rgb;

/// Minimal drawing surface in image pixel coordinates.
pub trait Rasterizer {
    /// Image size in pixels.
    fn size(&self) -> (u32, u32);

    /// Restrict drawing to the image rows `rows` until the next call.
    fn begin_frame(&mut self, rows: Range<u32>) -> Result<()>;

    /// Polyline through `points`.
    fn draw_line(&mut self, points: &[(i32, i32)], color: Rgb, thickness: u32) -> Result<()>;

    /// Filled circle with an outline `thickness` pixels wide drawn inside
    /// its radius.
    fn draw_circle(
        &mut self,
        center: (i32, i32),
        radius: u32,
        outline: Rgb,
        fill: Rgb,
        thickness: u32,
    ) -> Result<()>;
}

/// In-memory RGB image.
pub struct BitmapCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    frame: Range<u32>,
}

impl BitmapCanvas {
    /// Allocate a `width` x `height` image filled with `background`.
    ///
    /// Fails with [`CladeError::OutOfMemory`] when the buffer size overflows
    /// or the allocator refuses it.
    pub fn new(width: u32, height: u32, background: Rgb) -> Result<Self> {
        let out_of_memory = || CladeError::OutOfMemory { width, height };

        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(out_of_memory)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| out_of_memory())?;
        pixels.resize(len, 0);
        for pixel in pixels.chunks_exact_mut(3) {
            pixel.copy_from_slice(&[background.0, background.1, background.2]);
        }

        debug!(width, height, bytes = len, "allocated canvas");
        Ok(Self {
            width,
            height,
            pixels,
            frame: 0..height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color at `(x, y)`, if inside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some(Rgb(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    /// Convert into an `image` buffer.
    pub fn into_image(self) -> Result<image::RgbImage> {
        let (width, height) = (self.width, self.height);
        image::RgbImage::from_raw(width, height, self.pixels).ok_or_else(|| {
            CladeError::Drawing(format!("pixel buffer does not fill a {width}x{height} image"))
        })
    }

    /// Encode to `path`; the extension selects the format.
    pub fn save(self, path: &Path) -> Result<()> {
        self.into_image()?.save(path)?;
        Ok(())
    }

    /// Drawing area over the current frame's rows only.
    fn frame_area(&mut self) -> DrawingArea<BitMapBackend<'_>, Shift> {
        let row_bytes = self.width as usize * 3;
        let start = self.frame.start as usize * row_bytes;
        let end = self.frame.end as usize * row_bytes;
        let size = (self.width, self.frame.end - self.frame.start);
        BitMapBackend::with_buffer(&mut self.pixels[start..end], size).into_drawing_area()
    }

    fn to_frame(&self, (x, y): (i32, i32)) -> (i32, i32) {
        (x, y - self.frame.start as i32)
    }
}

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn drawing<E: std::fmt::Display>(result: std::result::Result<(), E>) -> Result<()> {
    result.map_err(|e| CladeError::Drawing(e.to_string()))
}

impl Rasterizer for BitmapCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self, rows: Range<u32>) -> Result<()> {
        let start = rows.start.min(self.height);
        let end = rows.end.clamp(start, self.height);
        self.frame = start..end;
        Ok(())
    }

    fn draw_line(&mut self, points: &[(i32, i32)], rgb: Rgb, thickness: u32) -> Result<()> {
        if points.len() < 2 || self.frame.is_empty() {
            return Ok(());
        }
        let path: Vec<(i32, i32)> = points.iter().map(|&p| self.to_frame(p)).collect();
        let style = color(rgb).stroke_width(thickness.max(1));
        let area = self.frame_area();
        drawing(area.draw(&PathElement::new(path, style)))?;
        drawing(area.present())
    }

    fn draw_circle(
        &mut self,
        center: (i32, i32),
        radius: u32,
        outline: Rgb,
        fill: Rgb,
        thickness: u32,
    ) -> Result<()> {
        if self.frame.is_empty() {
            return Ok(());
        }
        let center = self.to_frame(center);
        let area = self.frame_area();
        drawing(area.draw(&Circle::new(center, radius, color(outline).filled())))?;
        if radius > thickness {
            drawing(area.draw(&Circle::new(
                center,
                radius - thickness,
                color(fill).filled(),
            )))?;
        }
        drawing(area.present())
    }
}
