//! Curvature map from an encoded normal map.
//!
//! Takes the output of [`NormalGenerator`](crate::normal::NormalGenerator),
//! never the source image.  At each texel the X component of the left and
//! right neighbours and the Y component of the up and down neighbours are
//! decoded back to `[-1, 1]`, and the discrete divergence
//!
//! ```text
//! curvature = 0.5 * ((nx_right - nx_left) + (ny_down - ny_up))
//! ```
//!
//! is stored as `(curvature * 0.5 + 0.5) * 255`.  Flat regions encode as 128.

use crate::{
    buffer::{BoundaryMode, PixelBuffer, map_rows, to_channel},
    generator::{MapError, MapGenerator},
    normal::decode_normal,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurvatureGenerator {
    boundary: BoundaryMode,
}

impl CurvatureGenerator {
    pub fn new(boundary: BoundaryMode) -> Self {
        Self { boundary }
    }
}

impl MapGenerator for CurvatureGenerator {
    fn generate(&self, normal_map: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        let b = self.boundary;
        Ok(map_rows(normal_map.width(), normal_map.height(), |x, y| {
            let (x, y) = (x as isize, y as isize);
            let nx_left = decode_normal(normal_map.sample(x - 1, y, b)[0]);
            let nx_right = decode_normal(normal_map.sample(x + 1, y, b)[0]);
            let ny_up = decode_normal(normal_map.sample(x, y - 1, b)[1]);
            let ny_down = decode_normal(normal_map.sample(x, y + 1, b)[1]);
            let curvature = 0.5 * ((nx_right - nx_left) + (ny_down - ny_up));
            let c = to_channel((curvature * 0.5 + 0.5) * 255.0);
            [c, c, c, 255]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal::NormalGenerator;

    #[test]
    fn flat_normals_have_zero_curvature() {
        let flat = PixelBuffer::filled(5, 5, [128, 128, 255, 255]).unwrap();
        let out = CurvatureGenerator::default().generate(&flat).unwrap();
        assert!(out.pixels().chunks_exact(4).all(|p| p == [128, 128, 128, 255]));
    }

    #[test]
    fn diverging_normals_read_positive() {
        // X grows left to right: normals fan outward along X.
        let mut bytes = Vec::new();
        for _ in 0..3 {
            for r in [64u8, 128, 192] {
                bytes.extend_from_slice(&[r, 128, 221, 255]);
            }
        }
        let map = PixelBuffer::new(3, 3, bytes).unwrap();
        let out = CurvatureGenerator::default().generate(&map).unwrap();
        assert!(out.pixel(1, 1)[0] > 128);

        let mut bytes = Vec::new();
        for _ in 0..3 {
            for r in [192u8, 128, 64] {
                bytes.extend_from_slice(&[r, 128, 221, 255]);
            }
        }
        let map = PixelBuffer::new(3, 3, bytes).unwrap();
        let out = CurvatureGenerator::default().generate(&map).unwrap();
        assert!(out.pixel(1, 1)[0] < 128);
    }

    #[test]
    fn extreme_divergence_stays_in_range() {
        let bytes = [0u8, 0, 255, 255, 255, 255, 255, 255].repeat(2);
        let map = PixelBuffer::new(2, 2, bytes).unwrap();
        let out = CurvatureGenerator::new(BoundaryMode::Wrap)
            .generate(&map)
            .unwrap();
        assert!(out.pixels().chunks_exact(4).all(|p| p[3] == 255));
    }

    #[test]
    fn consumes_normal_generator_output() {
        let src = PixelBuffer::filled(8, 8, [128, 128, 128, 255]).unwrap();
        let normal = NormalGenerator::new(1.0, BoundaryMode::Clamp)
            .unwrap()
            .generate(&src)
            .unwrap();
        let out = CurvatureGenerator::default().generate(&normal).unwrap();
        assert_eq!(out.pixel(3, 3), [128, 128, 128, 255]);
        assert!(out.same_size(&src));
    }
}
