//! Roughness map: grayscale, optionally inverted.

use crate::{
    buffer::{PixelBuffer, map_pixels},
    color::gray_level,
    generator::{MapError, MapGenerator},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoughnessGenerator {
    /// Bright source regions become smooth instead of rough.
    pub invert: bool,
}

impl RoughnessGenerator {
    pub fn new(invert: bool) -> Self {
        Self { invert }
    }
}

impl MapGenerator for RoughnessGenerator {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        let invert = self.invert;
        Ok(map_pixels(source, |p| {
            let g = gray_level(p);
            let r = if invert { 255 - g } else { g };
            [r, r, r, p[3]]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_black_is_white() {
        let src = PixelBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap();
        let out = RoughnessGenerator::new(true).generate(&src).unwrap();
        assert!(out.pixels().iter().all(|&b| b == 255));
    }

    #[test]
    fn plain_roughness_is_grayscale() {
        let src = PixelBuffer::filled(2, 2, [10, 20, 30, 40]).unwrap();
        let out = RoughnessGenerator::new(false).generate(&src).unwrap();
        assert_eq!(out.pixel(0, 1), [20, 20, 20, 40]);
    }
}
