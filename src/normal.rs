//! Convert a source image into a tangent-space normal map.
//!
//! The source is reduced to grayscale, then a 3×3 Sobel operator estimates
//! the brightness gradient `(dx, dy)` at each texel.  The normal is
//! `normalize(dx, dy, 255 / strength)`, encoded as RGBA8 with:
//!   R = X
//!   G = Y
//!   B = Z  (always positive, points out of the surface)
//!   A = 255
//!
//! Components are remapped from [-1, 1] to \[0, 255\] via
//! `(n * 0.5 + 0.5) * 255`, so a flat surface encodes as `(128, 128, 255)`.

use crate::{
    buffer::{BoundaryMode, PixelBuffer, map_rows, to_channel},
    color::gray_level,
    generator::{MapError, MapGenerator, require_positive},
};

/// Sobel weights, row-major over the 3×3 neighbourhood.
const SOBEL_X: [[f64; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f64; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Derives a normal map from the corrected source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalGenerator {
    strength: f64,
    boundary: BoundaryMode,
}

impl NormalGenerator {
    /// `strength` must be finite and positive; larger values exaggerate relief.
    pub fn new(strength: f32, boundary: BoundaryMode) -> Result<Self, MapError> {
        let strength = require_positive("intensity", strength)?;
        Ok(Self {
            strength: strength as f64,
            boundary,
        })
    }
}

impl MapGenerator for NormalGenerator {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        let w = source.width() as usize;
        let h = source.height() as usize;

        // One gray level per texel up front; the kernel reads each one nine times.
        let gray: Vec<f64> = source
            .pixels()
            .chunks_exact(4)
            .map(|p| gray_level([p[0], p[1], p[2], p[3]]) as f64)
            .collect();

        // dz > 0 for any finite positive strength, so the length below is
        // always >= dz and the division is safe.
        let dz = 255.0 / self.strength;
        let boundary = self.boundary;

        Ok(map_rows(source.width(), source.height(), |x, y| {
            let mut dx = 0.0;
            let mut dy = 0.0;
            for (ky, (row_x, row_y)) in SOBEL_X.iter().zip(SOBEL_Y.iter()).enumerate() {
                let sy = boundary.resolve(y as isize + ky as isize - 1, h);
                for kx in 0..3 {
                    let sx = boundary.resolve(x as isize + kx as isize - 1, w);
                    let v = gray[sy * w + sx];
                    dx += row_x[kx] * v;
                    dy += row_y[kx] * v;
                }
            }
            let [nx, ny, nz] = normalize([dx, dy, dz]);
            [encode_normal(nx), encode_normal(ny), encode_normal(nz), 255]
        }))
    }
}

#[inline]
fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / len, v[1] / len, v[2] / len]
}

#[inline]
pub(crate) fn encode_normal(n: f64) -> u8 {
    to_channel((n * 0.5 + 0.5) * 255.0)
}

/// Inverse of the tangent-space encoding: `[0, 255]` back to `[-1, 1]`.
#[inline]
pub fn decode_normal(c: u8) -> f64 {
    c as f64 / 255.0 * 2.0 - 1.0
}
