//! Pipeline configuration.
//!
//! [`MapOptions`] is plain data: every field is independent and no
//! combination is invalid.  [`MapOptions::sanitized`] clamps continuous
//! inputs into their documented ranges and rejects the few values that
//! cannot be clamped meaningfully (non-positive strengths, NaN, a tiling
//! blend outside `(0, 0.5]`).

use bevy::log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    buffer::BoundaryMode,
    curve::TilingCurve,
    generator::{MapError, require_positive},
};

/// Seamless-tiling algorithm.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum TilingAlgorithm {
    /// Blend the half-shifted image back over the original around the seams.
    #[default]
    CrossBlend,
    /// Reflect the image into four quadrants.
    Mirror,
    /// Cross-blend with weights modulated by local gradient energy.
    PatchMatch,
    /// Half-shift only, exposing the former seams at the canvas centre.
    Offset,
}

/// Every parameter the map pipeline reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Normal-map strength, `(0, 5]`.
    pub intensity: f32,
    /// Contrast applied by colour correction and the height map, `[-1, 1]`.
    pub contrast: f32,
    /// Invert the roughness map.
    pub invert: bool,
    /// Additive brightness shift, `[-1, 1]`.
    pub brightness: f32,
    /// Saturation scale offset, `[-1, 1]`; `-1` desaturates fully.
    pub saturation: f32,
    /// Hue rotation in degrees, `[-180, 180]`.
    pub hue: f32,
    /// How far each channel is pulled toward the pixel mean, `[0, 1]`.
    pub delight_amount: f32,
    /// When `false` the metalness map is uniformly zero.
    pub is_metallic: bool,
    /// Metalness scale for metallic surfaces, `[0, 1]`.
    pub metalness_base: f32,
    /// Run the tiling stage before colour correction.
    pub tiling_enabled: bool,
    pub tiling_algorithm: TilingAlgorithm,
    /// Blend-zone width as a fraction of the image size, `(0, 0.5]`.
    pub tiling_blend: f32,
    pub tiling_curve: TilingCurve,
    /// Ambient-occlusion multiplier, `(0, 10]`.
    pub ao_strength: f32,
    /// Desaturation of the band along the mirror axes, `[0, 1]`.  `0` disables it.
    pub mirror_soften: f32,
    /// Neighbour lookup at the border for the kernel-based maps.
    pub edge_mode: BoundaryMode,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            contrast: 0.0,
            invert: false,
            brightness: 0.0,
            saturation: 0.0,
            hue: 0.0,
            delight_amount: 0.0,
            is_metallic: false,
            metalness_base: 0.5,
            tiling_enabled: false,
            tiling_algorithm: TilingAlgorithm::CrossBlend,
            tiling_blend: 0.2,
            tiling_curve: TilingCurve::Smooth,
            ao_strength: 1.0,
            mirror_soften: 0.35,
            edge_mode: BoundaryMode::Clamp,
        }
    }
}

/// Upper bound for [`MapOptions::intensity`].
pub const MAX_INTENSITY: f32 = 5.0;
/// Upper bound for [`MapOptions::ao_strength`].
pub const MAX_AO_STRENGTH: f32 = 10.0;
/// Upper bound for [`MapOptions::tiling_blend`].
pub const MAX_TILING_BLEND: f32 = 0.5;

impl MapOptions {
    /// Clamp continuous fields into range and reject unclampable values.
    pub fn sanitized(&self) -> Result<MapOptions, MapError> {
        let intensity = require_positive("intensity", self.intensity)?;
        let ao_strength = require_positive("ao_strength", self.ao_strength)?;
        let tiling_blend = validate_blend(self.tiling_blend)?;

        Ok(MapOptions {
            intensity: clamp_field("intensity", intensity, 0.0, MAX_INTENSITY)?,
            contrast: clamp_field("contrast", self.contrast, -1.0, 1.0)?,
            brightness: clamp_field("brightness", self.brightness, -1.0, 1.0)?,
            saturation: clamp_field("saturation", self.saturation, -1.0, 1.0)?,
            hue: clamp_field("hue", self.hue, -180.0, 180.0)?,
            delight_amount: clamp_field("delight_amount", self.delight_amount, 0.0, 1.0)?,
            metalness_base: clamp_field("metalness_base", self.metalness_base, 0.0, 1.0)?,
            tiling_blend,
            ao_strength: clamp_field("ao_strength", ao_strength, 0.0, MAX_AO_STRENGTH)?,
            mirror_soften: clamp_field("mirror_soften", self.mirror_soften, 0.0, 1.0)?,
            ..self.clone()
        })
    }
}

/// Reject a tiling blend outside `(0, 0.5]`.
pub(crate) fn validate_blend(blend: f32) -> Result<f32, MapError> {
    let blend = require_positive("tiling_blend", blend)?;
    if blend > MAX_TILING_BLEND {
        return Err(MapError::InvalidParameter {
            name: "tiling_blend",
            value: blend as f64,
            reason: "must not exceed 0.5",
        });
    }
    Ok(blend)
}

fn clamp_field(name: &'static str, value: f32, min: f32, max: f32) -> Result<f32, MapError> {
    if value.is_nan() {
        return Err(MapError::InvalidParameter {
            name,
            value: value as f64,
            reason: "must be a number",
        });
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("map option `{name}` = {value} clamped to {clamped}");
    }
    Ok(clamped)
}
