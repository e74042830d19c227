//! Height map: grayscale with a contrast remap.  Brighter means higher.

use crate::{
    buffer::{PixelBuffer, map_pixels, to_channel},
    color::{apply_contrast, contrast_factor, gray_level},
    generator::{MapError, MapGenerator},
};

/// Derives a height map from the corrected source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightGenerator {
    /// `[-1, 1]`; scaled by 128 before the contrast factor is computed.
    pub contrast: f64,
}

impl HeightGenerator {
    pub fn new(contrast: f32) -> Self {
        Self {
            contrast: (contrast as f64).clamp(-1.0, 1.0),
        }
    }
}

impl MapGenerator for HeightGenerator {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        let factor = contrast_factor(self.contrast * 128.0);
        Ok(map_pixels(source, |p| {
            let h = to_channel(apply_contrast(gray_level(p) as f64, factor));
            [h, h, h, p[3]]
        }))
    }
}
