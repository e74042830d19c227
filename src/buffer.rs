//! The RGBA8 pixel buffer every stage reads and writes.
//!
//! A [`PixelBuffer`] is row-major, straight-alpha RGBA8 with exactly
//! `width * height * 4` bytes.  Stages never mutate their input: each one
//! allocates a fresh output through [`map_pixels`] or [`map_rows`], which
//! split the output into rows and fill them in parallel with [`rayon`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::generator::{MapError, validate_dimensions};

/// How to handle pixel neighbours at the buffer boundary.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum BoundaryMode {
    /// Replicate the edge pixel: out-of-range coordinates are clamped.
    #[default]
    Clamp,
    /// Wrap indices toroidally, so maps derived from a tiled source stay seamless.
    Wrap,
}

impl BoundaryMode {
    /// Resolve a possibly out-of-range coordinate into `0..len`.
    ///
    /// `len` must be non-zero.
    #[inline]
    pub fn resolve(self, i: isize, len: usize) -> usize {
        let n = len as isize;
        match self {
            BoundaryMode::Clamp => i.clamp(0, n - 1) as usize,
            BoundaryMode::Wrap => i.rem_euclid(n) as usize,
        }
    }
}

/// Row-major RGBA8 image with straight (non-premultiplied) alpha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap decoded RGBA8 bytes.
    ///
    /// Fails with [`MapError::ByteLengthMismatch`] unless
    /// `pixels.len() == width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, MapError> {
        validate_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(MapError::ByteLengthMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A buffer where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, MapError> {
        validate_dimensions(width, height)?;
        let n = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            pixels: rgba.repeat(n),
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consume the buffer and hand back its bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Read the pixel at `(x, y)`.  Panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Read a neighbour, resolving out-of-range coordinates with `mode`.
    #[inline]
    pub fn sample(&self, x: isize, y: isize, mode: BoundaryMode) -> [u8; 4] {
        let sx = mode.resolve(x, self.width as usize);
        let sy = mode.resolve(y, self.height as usize);
        self.pixel(sx as u32, sy as u32)
    }

    /// `true` if both buffers have the same width and height.
    #[inline]
    pub fn same_size(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Fail with [`MapError::DimensionMismatch`] unless `other` matches in size.
    pub(crate) fn ensure_same_size(&self, other: &PixelBuffer) -> Result<(), MapError> {
        if self.same_size(other) {
            Ok(())
        } else {
            Err(MapError::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (other.width, other.height),
            })
        }
    }

    /// Internal constructor for outputs whose length is correct by construction.
    pub(crate) fn from_parts(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Apply a per-pixel transform to every pixel of `src`, in parallel by row.
pub(crate) fn map_pixels<F>(src: &PixelBuffer, f: F) -> PixelBuffer
where
    F: Fn([u8; 4]) -> [u8; 4] + Sync,
{
    let stride = src.width as usize * 4;
    let mut out = vec![0u8; src.pixels.len()];
    out.par_chunks_mut(stride)
        .zip(src.pixels.par_chunks(stride))
        .for_each(|(row_out, row_in)| {
            for (o, i) in row_out.chunks_exact_mut(4).zip(row_in.chunks_exact(4)) {
                o.copy_from_slice(&f([i[0], i[1], i[2], i[3]]));
            }
        });
    PixelBuffer::from_parts(src.width, src.height, out)
}

/// Fill a fresh `width × height` buffer by calling `f(x, y)` for every pixel,
/// in parallel by row.  Used by kernels that read neighbouring inputs.
pub(crate) fn map_rows<F>(width: u32, height: u32, f: F) -> PixelBuffer
where
    F: Fn(usize, usize) -> [u8; 4] + Sync,
{
    let w = width as usize;
    let stride = w * 4;
    let mut out = vec![0u8; stride * height as usize];
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row_out)| {
            for (x, o) in row_out.chunks_exact_mut(4).enumerate() {
                o.copy_from_slice(&f(x, y));
            }
        });
    PixelBuffer::from_parts(width, height, out)
}

/// Round and clamp a float channel into `[0, 255]`.  NaN maps to 0.
#[inline]
pub(crate) fn to_channel(v: f64) -> u8 {
    if v.is_nan() {
        0
    } else {
        v.round().clamp(0.0, 255.0) as u8
    }
}

/// Reproducible noise buffer for property tests.
#[cfg(test)]
pub(crate) fn random_buffer(width: u32, height: u32, seed: u64) -> PixelBuffer {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let bytes = (0..width * height * 4).map(|_| rng.random::<u8>()).collect();
    PixelBuffer::from_parts(width, height, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_byte_length() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            MapError::ByteLengthMismatch {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn size_mismatch_reports_both_shapes() {
        let wide = PixelBuffer::filled(4, 3, [0, 0, 0, 255]).unwrap();
        let tall = PixelBuffer::filled(3, 4, [0, 0, 0, 255]).unwrap();
        assert!(wide.ensure_same_size(&wide.clone()).is_ok());
        let err = wide.ensure_same_size(&tall).unwrap_err();
        assert_eq!(
            err,
            MapError::DimensionMismatch {
                expected: (4, 3),
                actual: (3, 4)
            }
        );
        assert_eq!(err.to_string(), "buffer size mismatch: expected 4×3, got 3×4");
    }

    #[test]
    fn rejects_zero_dimension() {
        assert!(matches!(
            PixelBuffer::new(0, 4, Vec::new()),
            Err(MapError::ZeroDimension { .. })
        ));
    }

    #[test]
    fn clamp_and_wrap_resolve_out_of_range() {
        assert_eq!(BoundaryMode::Clamp.resolve(-3, 5), 0);
        assert_eq!(BoundaryMode::Clamp.resolve(7, 5), 4);
        assert_eq!(BoundaryMode::Wrap.resolve(-1, 5), 4);
        assert_eq!(BoundaryMode::Wrap.resolve(5, 5), 0);
        // 1×1 buffers: every lookup lands on the single pixel.
        assert_eq!(BoundaryMode::Clamp.resolve(-2, 1), 0);
        assert_eq!(BoundaryMode::Wrap.resolve(2, 1), 0);
    }

    #[test]
    fn map_rows_visits_every_pixel() {
        let buf = map_rows(3, 2, |x, y| [x as u8, y as u8, 0, 255]);
        assert_eq!(buf.pixel(2, 1), [2, 1, 0, 255]);
        assert_eq!(buf.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn to_channel_saturates() {
        assert_eq!(to_channel(-4.0), 0);
        assert_eq!(to_channel(300.0), 255);
        assert_eq!(to_channel(127.5), 128);
        assert_eq!(to_channel(f64::NAN), 0);
        assert_eq!(to_channel(f64::INFINITY), 255);
    }
}
