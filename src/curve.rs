//! Blend-weight shaping curves used by the tiling algorithms.

use serde::{Deserialize, Serialize};

/// Shape of the falloff across a seam blend zone.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum TilingCurve {
    /// Identity: weight falls off linearly with distance.
    Linear,
    /// Smoothstep, `t²(3 − 2t)`.
    #[default]
    Smooth,
    /// Smootherstep, `t³(t(6t − 15) + 10)`: zero first and second derivative at both ends.
    Cubic,
}

impl TilingCurve {
    /// Map a normalised distance `t` to a blend weight.
    ///
    /// Every curve fixes `shape(0) = 0` and `shape(1) = 1` and is monotonic on
    /// `[0, 1]`; inputs outside that range are clamped first.
    #[inline]
    pub fn shape(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            TilingCurve::Linear => t,
            TilingCurve::Smooth => t * t * (3.0 - 2.0 * t),
            TilingCurve::Cubic => t * t * t * (t * (t * 6.0 - 15.0) + 10.0),
        }
    }
}
