//! CPU pixel surface with anti-aliased drawing primitives.
//!
//! The surface is also the capturable frame source: it can be uploaded to the
//! presenter or written to disk as PNG.

use std::path::Path;

use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::error::WaveError;

/// RGB color, alpha is passed per draw call
pub type Color = [u8; 3];

/// RGBA8 frame buffer in logical pixels, origin at the top-left
pub struct PixelSurface {
    image: RgbaImage,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Frame as an image (capture source)
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Raw RGBA bytes, row-major, for texture upload
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    pub fn clear(&mut self, color: Color) {
        let fill = Rgba([color[0], color[1], color[2], 255]);
        for pixel in self.image.pixels_mut() {
            *pixel = fill;
        }
    }

    /// Alpha-blend one pixel; out-of-bounds writes are dropped
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Color, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        for c in 0..3 {
            let mixed = color[c] as f32 * alpha + dst.0[c] as f32 * (1.0 - alpha);
            dst.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
        dst.0[3] = 255;
    }

    /// Fill the axis-aligned rectangle [x0, x1) × [y0, y1)
    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color, alpha: f32) {
        let (xa, xb) = (x0.min(x1).floor() as i32, x0.max(x1).ceil() as i32);
        let (ya, yb) = (y0.min(y1).floor() as i32, y0.max(y1).ceil() as i32);
        for y in ya..yb {
            for x in xa..xb {
                self.blend_pixel(x, y, color, alpha);
            }
        }
    }

    /// Anti-aliased filled disc
    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color, alpha: f32) {
        if radius <= 0.0 || !center.is_finite() {
            return;
        }
        let reach = radius + 1.0;
        let (xa, xb) = ((center.x - reach).floor() as i32, (center.x + reach).ceil() as i32);
        let (ya, yb) = ((center.y - reach).floor() as i32, (center.y + reach).ceil() as i32);
        for y in ya..=yb {
            for x in xa..=xb {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = (radius + 0.5 - p.distance(center)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, color, alpha * coverage);
                }
            }
        }
    }

    /// Anti-aliased line segment of the given width
    pub fn draw_line(&mut self, a: Vec2, b: Vec2, width: f32, color: Color, alpha: f32) {
        if !a.is_finite() || !b.is_finite() {
            return;
        }
        let half = (width * 0.5).max(0.5);
        let reach = half + 1.0;
        let (xa, xb) = ((a.x.min(b.x) - reach).floor() as i32, (a.x.max(b.x) + reach).ceil() as i32);
        let (ya, yb) = ((a.y.min(b.y) - reach).floor() as i32, (a.y.max(b.y) + reach).ceil() as i32);

        let ab = b - a;
        let len_sq = ab.length_squared();
        for y in ya..=yb {
            for x in xa..=xb {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq > 0.0 {
                    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let dist = p.distance(a + ab * t);
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, color, alpha * coverage);
                }
            }
        }
    }

    /// Connected line through consecutive points
    pub fn draw_polyline(&mut self, points: &[Vec2], width: f32, color: Color, alpha: f32) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], width, color, alpha);
        }
    }

    /// Line with a two-stroke head at `to`
    pub fn draw_arrow(&mut self, from: Vec2, to: Vec2, width: f32, color: Color, alpha: f32) {
        self.draw_line(from, to, width, color, alpha);

        let dir = (to - from).normalize_or_zero();
        if dir == Vec2::ZERO {
            return;
        }
        let head = ((to - from).length() * 0.35).clamp(2.0, 8.0);
        let normal = dir.perp();
        let back = to - dir * head;
        self.draw_line(to, back + normal * head * 0.6, width, color, alpha);
        self.draw_line(to, back - normal * head * 0.6, width, color, alpha);
    }

    /// Write the current frame as PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), WaveError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.image.save(path.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_and_blend() {
        let mut surface = PixelSurface::new(4, 4);
        surface.clear([10, 20, 30]);
        assert_eq!(surface.pixel(2, 2), [10, 20, 30, 255]);

        surface.blend_pixel(1, 1, [210, 20, 30], 0.5);
        assert_eq!(surface.pixel(1, 1), [110, 20, 30, 255]);

        // Out of bounds is ignored
        surface.blend_pixel(-1, 9, [255, 255, 255], 1.0);
    }

    #[test]
    fn test_circle_covers_center_not_corners() {
        let mut surface = PixelSurface::new(20, 20);
        surface.clear([0, 0, 0]);
        surface.fill_circle(Vec2::new(10.0, 10.0), 3.0, [255, 255, 255], 1.0);

        assert_eq!(surface.pixel(10, 10), [255, 255, 255, 255]);
        assert_eq!(surface.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(surface.pixel(10, 16), [0, 0, 0, 255]);
    }

    #[test]
    fn test_line_touches_its_path() {
        let mut surface = PixelSurface::new(32, 8);
        surface.clear([0, 0, 0]);
        surface.draw_line(
            Vec2::new(2.0, 4.0),
            Vec2::new(30.0, 4.0),
            2.0,
            [0, 255, 0],
            1.0,
        );

        assert_eq!(surface.pixel(16, 3)[1], 255);
        assert_eq!(surface.pixel(16, 0)[1], 0);
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames").join("frame.png");

        let mut surface = PixelSurface::new(8, 8);
        surface.clear([1, 2, 3]);
        surface.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.get_pixel(3, 3).0, [1, 2, 3, 255]);
    }
}
