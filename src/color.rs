//! Colour correction and grayscale reduction.
//!
//! [`ColorCorrection`] runs five stages per pixel, in a fixed order, each
//! consuming the previous stage's output:
//!
//!  1. delight — pull channels toward the pixel mean, flattening highlights
//!  2. brightness — additive shift
//!  3. contrast — polynomial remap around the 128 midpoint
//!  4. saturation — scale the distance from luminance
//!  5. hue — fixed luminance-preserving 3×3 rotation
//!
//! Channels stay in `f64` and are clamped to `[0, 255]` only once at the
//! end, so headroom produced by one stage is still visible to the next.
//!
//! The hue matrix is the usual approximation (the one CSS `hue-rotate`
//! uses), not an HSL round trip; it is not colorimetrically exact.

use crate::{
    buffer::{PixelBuffer, map_pixels, to_channel},
    generator::{MapError, MapGenerator},
    options::MapOptions,
};

/// Luminance weights for the saturation stage.
const LUMA: [f64; 3] = [0.2989, 0.587, 0.114];

/// Polynomial contrast factor for a contrast offset `c` in channel units.
///
/// `c = 0` gives exactly 1.  `c` must stay below 259.
#[inline]
pub(crate) fn contrast_factor(c: f64) -> f64 {
    259.0 * (c + 255.0) / (255.0 * (259.0 - c))
}

/// Apply a contrast factor around the 128 midpoint.
#[inline]
pub(crate) fn apply_contrast(v: f64, factor: f64) -> f64 {
    factor * (v - 128.0) + 128.0
}

/// Unweighted channel mean, rounded.
#[inline]
pub fn gray_level(p: [u8; 4]) -> u8 {
    let sum = p[0] as u32 + p[1] as u32 + p[2] as u32;
    ((sum + 1) / 3) as u8
}

/// Replace R, G and B with the unweighted channel mean; alpha passes through.
pub fn to_grayscale(src: &PixelBuffer) -> PixelBuffer {
    map_pixels(src, |p| {
        let g = gray_level(p);
        [g, g, g, p[3]]
    })
}

/// Brightness/contrast/saturation/hue/delight adjustment.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorCorrection {
    pub delight: f64,
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    /// Degrees.
    pub hue: f64,
}

impl ColorCorrection {
    /// Build from sanitised options.
    pub fn new(options: &MapOptions) -> Self {
        Self {
            delight: options.delight_amount as f64,
            brightness: options.brightness as f64,
            contrast: options.contrast as f64,
            saturation: options.saturation as f64,
            hue: options.hue as f64,
        }
    }

    /// `true` if every stage is a no-op.
    pub fn is_identity(&self) -> bool {
        self.delight == 0.0
            && self.brightness == 0.0
            && self.contrast == 0.0
            && self.saturation == 0.0
            && self.hue == 0.0
    }

    fn hue_matrix(&self) -> Option<[[f64; 3]; 3]> {
        if self.hue == 0.0 {
            return None;
        }
        let (sin, cos) = self.hue.to_radians().sin_cos();
        Some([
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ])
    }

    /// Run all five stages on one pixel.  Alpha passes through.
    fn correct(&self, p: [u8; 4], factor: f64, hue: Option<&[[f64; 3]; 3]>) -> [u8; 4] {
        let mut c = [p[0] as f64, p[1] as f64, p[2] as f64];

        let mean = (c[0] + c[1] + c[2]) / 3.0;
        let pull = self.delight * 0.5;
        let shift = self.brightness * 255.0;
        for v in &mut c {
            *v += (mean - *v) * pull;
            *v += shift;
            *v = apply_contrast(*v, factor);
        }

        let lum = LUMA[0] * c[0] + LUMA[1] * c[1] + LUMA[2] * c[2];
        let sat = 1.0 + self.saturation;
        for v in &mut c {
            *v = lum + (*v - lum) * sat;
        }

        if let Some(m) = hue {
            c = [
                m[0][0] * c[0] + m[0][1] * c[1] + m[0][2] * c[2],
                m[1][0] * c[0] + m[1][1] * c[1] + m[1][2] * c[2],
                m[2][0] * c[0] + m[2][1] * c[1] + m[2][2] * c[2],
            ];
        }

        [to_channel(c[0]), to_channel(c[1]), to_channel(c[2]), p[3]]
    }
}

impl MapGenerator for ColorCorrection {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        if self.is_identity() {
            return Ok(source.clone());
        }
        let factor = contrast_factor(self.contrast.clamp(-1.0, 1.0) * 255.0);
        let hue = self.hue_matrix();
        Ok(map_pixels(source, |p| self.correct(p, factor, hue.as_ref())))
    }
}
