//! Drawing surface the playback controller renders into.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage, imageops};

use crate::error::Result;
use crate::processing::blur::apply_blur;

/// Rendering primitives consumed by the controller.
pub trait Canvas {
    fn dimensions(&self) -> (u32, u32);

    /// Reallocate for new geometry; contents are cleared.
    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, rgb: [u8; 3]);

    /// Blur the whole surface in place.
    fn blur(&mut self, sigma: f32);

    /// Paint `image` stretched over the full canvas.
    fn draw_image(&mut self, image: &RgbImage);

    /// Encode the current contents as PNG.
    fn export_png(&self) -> Result<Vec<u8>>;
}

/// CPU canvas backed by an RGB pixel buffer.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    pixels: RgbImage,
    background: Rgb<u8>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let background = Rgb([0, 0, 0]);
        Self {
            pixels: RgbImage::from_pixel(width, height, background),
            background,
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

impl Canvas for RasterCanvas {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pixels = RgbImage::from_pixel(width, height, self.background);
    }

    fn clear(&mut self) {
        for p in self.pixels.pixels_mut() {
            *p = self.background;
        }
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, rgb: [u8; 3]) {
        let (w, h) = self.pixels.dimensions();
        if w == 0 || h == 0 || radius <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        let x0 = (x - radius).floor().max(0.0) as u32;
        let y0 = (y - radius).floor().max(0.0) as u32;
        let x1 = ((x + radius).ceil().max(0.0) as u32).min(w - 1);
        let y1 = ((y + radius).ceil().max(0.0) as u32).min(h - 1);
        let color = Rgb(rgb);
        for py in y0..=y1 {
            let dy = py as f32 + 0.5 - y;
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - x;
                if dx * dx + dy * dy <= r2 {
                    self.pixels.put_pixel(px, py, color);
                }
            }
        }
    }

    fn blur(&mut self, sigma: f32) {
        self.pixels = apply_blur(&self.pixels, sigma);
    }

    fn draw_image(&mut self, image: &RgbImage) {
        let (w, h) = self.pixels.dimensions();
        if image.dimensions() == (w, h) {
            self.pixels.copy_from_slice(image.as_raw());
        } else {
            self.pixels = imageops::resize(image, w, h, imageops::FilterType::Triangle);
        }
    }

    fn export_png(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}
