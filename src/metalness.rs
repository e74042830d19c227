//! Metalness map.
//!
//! Dielectric surfaces get a uniformly zero map.  For metals, brighter
//! source regions are treated as more metallic: `gray * base`.

use crate::{
    buffer::{PixelBuffer, map_pixels, to_channel},
    color::gray_level,
    generator::{MapError, MapGenerator},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetalnessGenerator {
    pub is_metallic: bool,
    /// `[0, 1]` scale applied to the gray level.
    pub base: f64,
}

impl MetalnessGenerator {
    pub fn new(is_metallic: bool, base: f32) -> Self {
        let base = if base.is_nan() { 0.0 } else { base as f64 };
        Self {
            is_metallic,
            base: base.clamp(0.0, 1.0),
        }
    }
}

impl MapGenerator for MetalnessGenerator {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        if !self.is_metallic {
            return PixelBuffer::filled(source.width(), source.height(), [0, 0, 0, 255]);
        }
        let base = self.base;
        Ok(map_pixels(source, |p| {
            let m = to_channel(gray_level(p) as f64 * base);
            [m, m, m, 255]
        }))
    }
}
