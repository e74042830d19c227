//! Seamless tiling of an arbitrary source image.
//!
//! Three of the four algorithms start from the *offset* image: the source
//! shifted by half its width and height with wrap-around,
//!
//! ```text
//! offset[y][x] = source[(y + h/2) mod h][(x + w/2) mod w]
//! ```
//!
//! which moves the left↔right and top↔bottom seams to the two centre lines
//! of the canvas while the canvas border now shows the source's interior.
//!
//! - [`TilingAlgorithm::Offset`] returns the offset image as is.
//! - [`TilingAlgorithm::CrossBlend`] fades from the offset image back to the
//!   untouched source inside a band around each centre line.
//! - [`TilingAlgorithm::PatchMatch`] does the same, but scales the band
//!   weight by the relative gradient energy of the two images.
//! - [`TilingAlgorithm::Mirror`] reflects a downsampled copy into four
//!   quadrants; edges match by construction.
//!
//! Every algorithm is a pure function of its input and preserves size.

use rayon::prelude::*;

use crate::{
    buffer::{BoundaryMode, PixelBuffer, map_rows, to_channel},
    curve::TilingCurve,
    generator::{MapError, MapGenerator},
    options::{MapOptions, TilingAlgorithm, validate_blend},
};

/// Rec. 601 luminance weights, scaled by 1000 so band sums stay exact.
const LUMA_MILLI: [u32; 3] = [299, 587, 114];

/// Makes a buffer tileable with one of the [`TilingAlgorithm`]s.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilingProcessor {
    algorithm: TilingAlgorithm,
    blend: f64,
    curve: TilingCurve,
    mirror_soften: f64,
    boundary: BoundaryMode,
}

impl TilingProcessor {
    /// `blend` is the blend-zone width as a fraction of the image size and
    /// must lie in `(0, 0.5]`.
    pub fn new(algorithm: TilingAlgorithm, blend: f32, curve: TilingCurve) -> Result<Self, MapError> {
        let blend = validate_blend(blend)?;
        Ok(Self {
            algorithm,
            blend: blend as f64,
            curve,
            mirror_soften: 0.0,
            boundary: BoundaryMode::Clamp,
        })
    }

    /// Build from sanitised options.
    pub fn from_options(options: &MapOptions) -> Result<Self, MapError> {
        Ok(Self::new(options.tiling_algorithm, options.tiling_blend, options.tiling_curve)?
            .with_mirror_soften(options.mirror_soften)
            .with_boundary(options.edge_mode))
    }

    /// Desaturate the band along the mirror axes by up to `amount` (`[0, 1]`).
    pub fn with_mirror_soften(mut self, amount: f32) -> Self {
        self.mirror_soften = if amount.is_nan() {
            0.0
        } else {
            (amount as f64).clamp(0.0, 1.0)
        };
        self
    }

    /// Neighbour policy for the gradient-energy and band-luminance kernels.
    pub fn with_boundary(mut self, boundary: BoundaryMode) -> Self {
        self.boundary = boundary;
        self
    }
}

impl MapGenerator for TilingProcessor {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError> {
        Ok(match self.algorithm {
            TilingAlgorithm::Offset => offset_shift(source, false),
            TilingAlgorithm::CrossBlend => self.cross_blend(source),
            TilingAlgorithm::PatchMatch => self.patch_match(source),
            TilingAlgorithm::Mirror => self.mirror(source),
        })
    }
}

/// Wrap-around shift by half the width and height.
///
/// The forward shift moves by `(w/2, h/2)`; `inverse` moves by
/// `(w - w/2, h - h/2)` and undoes it for any size.  For even sizes the two
/// coincide, so applying the forward shift twice returns the source.
pub fn offset_shift(source: &PixelBuffer, inverse: bool) -> PixelBuffer {
    let w = source.width() as usize;
    let h = source.height() as usize;
    let (sx, sy) = if inverse {
        (w - w / 2, h - h / 2)
    } else {
        (w / 2, h / 2)
    };
    let stride = w * 4;
    let src = source.pixels();
    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let from = &src[((y + sy) % h) * stride..][..stride];
        // Row rotation: the tail starting at column `sx` comes first.
        let split = sx * 4;
        row[..stride - split].copy_from_slice(&from[split..]);
        row[stride - split..].copy_from_slice(&from[..split]);
    });
    PixelBuffer::from_parts(source.width(), source.height(), out)
}

/// Blend weight at `pos` for a seam centred on `center`.
///
/// 1 at the centre, falling through `curve` to 0 at distance `zone` and
/// beyond.  `zone` must be positive.
#[inline]
pub fn seam_weight(pos: f64, center: f64, zone: f64, curve: TilingCurve) -> f64 {
    curve.shape(1.0 - (pos - center).abs() / zone)
}

/// Patch-match weight: the seam weight scaled by the share of gradient
/// energy that belongs to the original image.
///
/// Ranges from `0.5 * seam` (original flat) toward `seam` (original busy).
#[inline]
pub fn patch_weight(seam: f64, energy_original: f64, energy_offset: f64) -> f64 {
    let energy_factor = energy_original / (energy_original + energy_offset + 1.0);
    seam * (0.5 + 0.5 * energy_factor)
}

impl TilingProcessor {
    /// Combined weight of the vertical and horizontal seams at `(x, y)`.
    fn cross_weight(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let weight_h = seam_weight(x as f64, (w / 2) as f64, self.blend * w as f64, self.curve);
        let weight_v = seam_weight(y as f64, (h / 2) as f64, self.blend * h as f64, self.curve);
        weight_h.max(weight_v)
    }

    fn cross_blend(&self, source: &PixelBuffer) -> PixelBuffer {
        let offset = offset_shift(source, false);
        let (w, h) = (source.width() as usize, source.height() as usize);
        map_rows(source.width(), source.height(), |x, y| {
            let weight = self.cross_weight(x, y, w, h);
            lerp_pixel(
                offset.pixel(x as u32, y as u32),
                source.pixel(x as u32, y as u32),
                weight,
            )
        })
    }

    fn patch_match(&self, source: &PixelBuffer) -> PixelBuffer {
        let offset = offset_shift(source, false);
        let (w, h) = (source.width() as usize, source.height() as usize);
        let (energy_original, energy_offset) = rayon::join(
            || energy_map(source, self.boundary),
            || energy_map(&offset, self.boundary),
        );
        map_rows(source.width(), source.height(), |x, y| {
            let seam = self.cross_weight(x, y, w, h);
            let i = y * w + x;
            let weight = if seam > 0.0 {
                patch_weight(seam, energy_original[i], energy_offset[i])
            } else {
                0.0
            };
            lerp_pixel(
                offset.pixel(x as u32, y as u32),
                source.pixel(x as u32, y as u32),
                weight,
            )
        })
    }

    fn mirror(&self, source: &PixelBuffer) -> PixelBuffer {
        let (w, h) = (source.width() as usize, source.height() as usize);
        let (qw, qh) = (w.div_ceil(2), h.div_ceil(2));

        // Top-left quadrant: the whole source box-filtered to qw × qh.
        let quadrant = map_rows(qw as u32, qh as u32, |qx, qy| {
            let (x0, x1) = span(qx, qw, w);
            let (y0, y1) = span(qy, qh, h);
            let mut sum = [0u32; 4];
            for sy in y0..y1 {
                for sx in x0..x1 {
                    let p = source.pixel(sx as u32, sy as u32);
                    for c in 0..4 {
                        sum[c] += p[c] as u32;
                    }
                }
            }
            let n = ((x1 - x0) * (y1 - y0)) as u32;
            sum.map(|s| ((s + n / 2) / n) as u8)
        });

        // Folding each axis reflects the quadrant into the other three, so
        // column x equals column w-1-x and row y equals row h-1-y.
        let canvas = map_rows(source.width(), source.height(), |x, y| {
            quadrant.pixel(fold(x, w) as u32, fold(y, h) as u32)
        });

        if self.mirror_soften <= 0.0 {
            return canvas;
        }
        self.soften_mirror_axes(&canvas, qw, qh)
    }

    /// Pull a cross-shaped band around the mirror axes toward the local
    /// average luminance, hiding the reflected detail at the fold.
    ///
    /// Each axis ramps through the curve from 0 on the fold line to 1 at the
    /// zone edge; the band weight is `1 - min(ramp_h, ramp_v)`.
    fn soften_mirror_axes(&self, canvas: &PixelBuffer, qw: usize, qh: usize) -> PixelBuffer {
        let (w, h) = (canvas.width() as usize, canvas.height() as usize);
        // Integer sums keep the band exactly symmetric about the fold.
        let luma: Vec<u32> = canvas
            .pixels()
            .chunks_exact(4)
            .map(|p| {
                LUMA_MILLI[0] * p[0] as u32 + LUMA_MILLI[1] * p[1] as u32 + LUMA_MILLI[2] * p[2] as u32
            })
            .collect();
        let zone_x = self.blend * w as f64;
        let zone_y = self.blend * h as f64;
        let b = self.boundary;

        map_rows(canvas.width(), canvas.height(), |x, y| {
            let p = canvas.pixel(x as u32, y as u32);
            let ramp_h = self.curve.shape((qw - 1 - fold(x, w)) as f64 / zone_x);
            let ramp_v = self.curve.shape((qh - 1 - fold(y, h)) as f64 / zone_y);
            let amount = self.mirror_soften * (1.0 - ramp_h.min(ramp_v));
            if amount <= 0.0 {
                return p;
            }
            let mut sum = 0u32;
            for dy in -1..=1isize {
                let sy = b.resolve(y as isize + dy, h);
                for dx in -1..=1isize {
                    sum += luma[sy * w + b.resolve(x as isize + dx, w)];
                }
            }
            let local = sum as f64 / 9000.0;
            let pull = |c: u8| to_channel(c as f64 + (local - c as f64) * amount);
            [pull(p[0]), pull(p[1]), pull(p[2]), p[3]]
        })
    }
}

/// Distance-from-the-nearer-edge coordinate: `min(i, len - 1 - i)`.
#[inline]
fn fold(i: usize, len: usize) -> usize {
    i.min(len - 1 - i)
}

/// Source index range `[start, end)` that quadrant cell `q` of `cells` covers.
#[inline]
fn span(q: usize, cells: usize, len: usize) -> (usize, usize) {
    let start = q * len / cells;
    let end = ((q + 1) * len / cells).max(start + 1).min(len);
    (start, end)
}

/// Summed absolute RGB gradient over the 4-neighbour cross at every texel.
fn energy_map(buf: &PixelBuffer, boundary: BoundaryMode) -> Vec<f64> {
    let w = buf.width() as usize;
    let h = buf.height() as usize;
    let mut out = vec![0.0f64; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let y = y as isize;
        for (x, e) in row.iter_mut().enumerate() {
            let x = x as isize;
            let left = buf.sample(x - 1, y, boundary);
            let right = buf.sample(x + 1, y, boundary);
            let up = buf.sample(x, y - 1, boundary);
            let down = buf.sample(x, y + 1, boundary);
            *e = (0..3)
                .map(|c| {
                    (right[c] as f64 - left[c] as f64).abs() + (down[c] as f64 - up[c] as f64).abs()
                })
                .sum();
        }
    });
    out
}

/// `a * (1 - t) + b * t` per channel, alpha included.
#[inline]
fn lerp_pixel(a: [u8; 4], b: [u8; 4], t: f64) -> [u8; 4] {
    std::array::from_fn(|c| to_channel(a[c] as f64 * (1.0 - t) + b[c] as f64 * t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::random_buffer;

    const CURVES: [TilingCurve; 3] = [TilingCurve::Linear, TilingCurve::Smooth, TilingCurve::Cubic];
    const ALGORITHMS: [TilingAlgorithm; 4] = [
        TilingAlgorithm::CrossBlend,
        TilingAlgorithm::Mirror,
        TilingAlgorithm::PatchMatch,
        TilingAlgorithm::Offset,
    ];

    /// Gray ramp rising 4 per column, constant down each column.
    fn column_ramp(w: u32, h: u32) -> PixelBuffer {
        let mut bytes = Vec::with_capacity((w * h * 4) as usize);
        for _ in 0..h {
            for x in 0..w {
                let v = (x * 4) as u8;
                bytes.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::new(w, h, bytes).unwrap()
    }

    fn tile(src: &PixelBuffer, algorithm: TilingAlgorithm, blend: f32, curve: TilingCurve) -> PixelBuffer {
        TilingProcessor::new(algorithm, blend, curve)
            .unwrap()
            .with_mirror_soften(0.35)
            .generate(src)
            .unwrap()
    }

    #[test]
    fn offset_twice_is_identity_for_even_sizes() {
        let src = random_buffer(16, 10, 1);
        let once = tile(&src, TilingAlgorithm::Offset, 0.2, TilingCurve::Linear);
        assert_ne!(once, src);
        let twice = tile(&once, TilingAlgorithm::Offset, 0.2, TilingCurve::Linear);
        assert_eq!(twice, src);
    }

    #[test]
    fn inverse_shift_undoes_odd_sizes() {
        let src = random_buffer(7, 5, 2);
        let shifted = offset_shift(&src, false);
        assert_eq!(offset_shift(&shifted, true), src);
    }

    #[test]
    fn offset_moves_centre_to_corner() {
        let src = random_buffer(8, 6, 3);
        let out = offset_shift(&src, false);
        assert_eq!(out.pixel(0, 0), src.pixel(4, 3));
        assert_eq!(out.pixel(3, 2), src.pixel(7, 5));
        assert_eq!(out.pixel(4, 3), src.pixel(0, 0));
    }

    #[test]
    fn seam_weight_is_one_at_centre_and_zero_at_zone_edge() {
        for curve in CURVES {
            assert!((seam_weight(32.0, 32.0, 16.0, curve) - 1.0).abs() < 1e-12);
            assert_eq!(seam_weight(48.0, 32.0, 16.0, curve), 0.0);
            assert_eq!(seam_weight(16.0, 32.0, 16.0, curve), 0.0);
            assert_eq!(seam_weight(0.0, 32.0, 16.0, curve), 0.0);
            let mut prev = 1.0;
            for d in 1..=17 {
                let wgt = seam_weight(32.0 + d as f64, 32.0, 16.0, curve);
                assert!(wgt <= prev, "{curve:?} rose at distance {d}");
                prev = wgt;
            }
        }
    }

    #[test]
    fn patch_weight_prefers_busy_original() {
        assert_eq!(patch_weight(1.0, 0.0, 0.0), 0.5);
        assert!(patch_weight(1.0, 1e6, 0.0) > 0.99);
        assert!(patch_weight(1.0, 10.0, 500.0) < patch_weight(1.0, 500.0, 10.0));
        assert_eq!(patch_weight(0.0, 50.0, 5.0), 0.0);
    }

    #[test]
    fn cross_blend_keeps_original_at_centre_and_offset_at_corners() {
        let src = random_buffer(32, 24, 4);
        let offset = offset_shift(&src, false);
        for curve in CURVES {
            let out = tile(&src, TilingAlgorithm::CrossBlend, 0.2, curve);
            assert_eq!(out.pixel(16, 12), src.pixel(16, 12));
            assert_eq!(out.pixel(16, 0), src.pixel(16, 0));
            assert_eq!(out.pixel(0, 0), offset.pixel(0, 0));
            assert_eq!(out.pixel(31, 23), offset.pixel(31, 23));
        }
    }

    #[test]
    fn cross_blend_smooths_vertical_seam_away_from_cross() {
        // The ramp jumps 252 → 0 across its left/right border.  Rows outside
        // the horizontal band only see the vertical seam, which a linear
        // curve over 12.8 px spreads at ≤ 128 / 12.8 per step.
        let src = column_ramp(64, 64);
        let offset = offset_shift(&src, false);
        assert_eq!(offset.pixel(31, 0)[0].abs_diff(offset.pixel(32, 0)[0]), 252);

        let out = tile(&src, TilingAlgorithm::CrossBlend, 0.2, TilingCurve::Linear);
        for y in (0..20).chain(45..64) {
            for x in 0..64u32 {
                let a = out.pixel(x, y)[0];
                let b = out.pixel((x + 1) % 64, y)[0];
                assert!(a.abs_diff(b) <= 11, "step {a}→{b} at ({x}, {y})");
            }
        }
    }

    #[test]
    fn cross_blend_smooths_both_seams_including_the_cross() {
        // 2x + 2y jumps at both borders, so the offset image carries a
        // vertical and a horizontal seam that meet in the centre.  Original
        // and offset differ by at most 128, spread over 12.8 px by a linear
        // curve: no interior step may exceed 128 / 12.8 = 10.
        let mut bytes = Vec::with_capacity(64 * 64 * 4);
        for y in 0..64u32 {
            for x in 0..64u32 {
                let v = (2 * x + 2 * y) as u8;
                bytes.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let src = PixelBuffer::new(64, 64, bytes).unwrap();
        let offset = offset_shift(&src, false);
        assert_eq!(offset.pixel(31, 0)[0].abs_diff(offset.pixel(32, 0)[0]), 126);
        assert_eq!(offset.pixel(0, 31)[0].abs_diff(offset.pixel(0, 32)[0]), 126);

        let out = tile(&src, TilingAlgorithm::CrossBlend, 0.2, TilingCurve::Linear);
        for y in 0..64u32 {
            for x in 0..64u32 {
                let here = out.pixel(x, y)[0];
                if x + 1 < 64 {
                    let right = out.pixel(x + 1, y)[0];
                    assert!(here.abs_diff(right) <= 10, "x step {here}→{right} at ({x}, {y})");
                }
                if y + 1 < 64 {
                    let below = out.pixel(x, y + 1)[0];
                    assert!(here.abs_diff(below) <= 10, "y step {here}→{below} at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn mirror_edges_match() {
        for (w, h) in [(16, 12), (9, 7), (2, 2), (1, 3)] {
            let src = random_buffer(w, h, 5);
            for soften in [0.0, 1.0] {
                let out = TilingProcessor::new(TilingAlgorithm::Mirror, 0.25, TilingCurve::Smooth)
                    .unwrap()
                    .with_mirror_soften(soften)
                    .generate(&src)
                    .unwrap();
                for y in 0..h {
                    assert_eq!(out.pixel(0, y), out.pixel(w - 1, y), "{w}×{h} row {y}");
                }
                for x in 0..w {
                    assert_eq!(out.pixel(x, 0), out.pixel(x, h - 1), "{w}×{h} col {x}");
                }
            }
        }
    }

    #[test]
    fn mirror_quadrant_is_downsampled_source() {
        let mut bytes = Vec::new();
        for y in 0..4u8 {
            for x in 0..4u8 {
                bytes.extend_from_slice(&[x * 40, y * 40, 0, 255]);
            }
        }
        let src = PixelBuffer::new(4, 4, bytes).unwrap();
        let out = TilingProcessor::new(TilingAlgorithm::Mirror, 0.2, TilingCurve::Linear)
            .unwrap()
            .generate(&src)
            .unwrap();
        // Cell (0, 0) averages source x, y ∈ {0, 1}: (0 + 40) / 2 = 20.
        assert_eq!(out.pixel(0, 0), [20, 20, 0, 255]);
        // Cell (1, 1) averages x, y ∈ {2, 3}.
        assert_eq!(out.pixel(1, 1), [100, 100, 0, 255]);
        assert_eq!(out.pixel(2, 1), out.pixel(1, 1));
        assert_eq!(out.pixel(3, 3), out.pixel(0, 0));
    }

    #[test]
    fn uniform_source_is_a_fixed_point() {
        let src = PixelBuffer::filled(12, 10, [90, 90, 90, 255]).unwrap();
        for algorithm in ALGORITHMS {
            assert_eq!(tile(&src, algorithm, 0.3, TilingCurve::Cubic), src, "{algorithm:?}");
        }
    }

    #[test]
    fn patch_match_lies_between_offset_and_original() {
        let src = random_buffer(20, 20, 6);
        let offset = offset_shift(&src, false);
        let out = tile(&src, TilingAlgorithm::PatchMatch, 0.3, TilingCurve::Smooth);
        for y in 0..20 {
            for x in 0..20 {
                let (o, s, r) = (offset.pixel(x, y), src.pixel(x, y), out.pixel(x, y));
                for c in 0..4 {
                    let (lo, hi) = (o[c].min(s[c]), o[c].max(s[c]));
                    assert!(r[c] >= lo && r[c] <= hi, "({x}, {y}) channel {c}");
                }
            }
        }
        // Outside both bands nothing of the original shows.
        assert_eq!(out.pixel(0, 0), offset.pixel(0, 0));
    }

    #[test]
    fn every_algorithm_preserves_size() {
        for (w, h) in [(7, 5), (1, 1), (3, 8)] {
            let src = random_buffer(w, h, 7);
            for algorithm in ALGORITHMS {
                let out = tile(&src, algorithm, 0.5, TilingCurve::Smooth);
                assert!(out.same_size(&src), "{algorithm:?} {w}×{h}");
                assert_eq!(out.pixels().len(), src.pixels().len());
            }
        }
    }

    #[test]
    fn blend_outside_range_is_rejected() {
        for blend in [0.0, -0.2, 0.6, f32::NAN] {
            assert!(
                TilingProcessor::new(TilingAlgorithm::CrossBlend, blend, TilingCurve::Linear).is_err(),
                "{blend} accepted"
            );
        }
    }
}
