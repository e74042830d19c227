//! Ambient-occlusion map from local cavity depth.
//!
//! Each texel is compared with the mean gray level of its 5×5 neighbourhood.
//! Texels darker than their surroundings sit in a cavity and receive more
//! occlusion: `255 - max(0, mean - center) * strength`, floored at 0.

use crate::{
    buffer::{BoundaryMode, PixelBuffer, map_rows, to_channel},
    color::gray_level,
    generator::{MapError, MapGenerator, require_positive},
};

/// Half-width of the square neighbourhood.
const RADIUS: isize = 2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OcclusionGenerator {
    strength: f64,
    boundary: BoundaryMode,
}

impl OcclusionGenerator {
    /// `strength` multiplies the cavity depth and must be finite and positive.
    pub fn new(strength: f32, boundary: BoundaryMode) -> Result<Self, MapError> {
        let strength = require_positive("ao_strength", strength)?;
        Ok(Self {
            strength: strength as f64,
            boundary,
        })
    }
}

impl MapGenerator for OcclusionGenerator {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        let w = source.width() as usize;
        let h = source.height() as usize;
        let gray: Vec<f64> = source
            .pixels()
            .chunks_exact(4)
            .map(|p| gray_level([p[0], p[1], p[2], p[3]]) as f64)
            .collect();
        let taps = ((2 * RADIUS + 1) * (2 * RADIUS + 1)) as f64;
        let (strength, boundary) = (self.strength, self.boundary);

        Ok(map_rows(source.width(), source.height(), |x, y| {
            let mut sum = 0.0;
            for dy in -RADIUS..=RADIUS {
                let sy = boundary.resolve(y as isize + dy, h);
                for dx in -RADIUS..=RADIUS {
                    let sx = boundary.resolve(x as isize + dx, w);
                    sum += gray[sy * w + sx];
                }
            }
            let center = gray[y * w + x];
            let cavity = (sum / taps - center).max(0.0);
            let ao = to_channel((255.0 - cavity * strength).max(0.0));
            [ao, ao, ao, 255]
        }))
    }
}
