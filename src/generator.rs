//! Core trait, error type and GPU upload shared by all map generators.

use std::sync::OnceLock;

use bevy::{
    asset::{Assets, RenderAssetUsages},
    image::{Image, ImageAddressMode, ImageSampler, ImageSamplerDescriptor},
    prelude::Handle,
    render::render_resource::{Extent3d, TextureDimension, TextureFormat},
};

use crate::{buffer::PixelBuffer, pipeline::MapSet};

/// Error returned when an input buffer or parameter cannot be processed.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// Either `width` or `height` was zero.
    ZeroDimension { width: u32, height: u32 },
    /// One or both dimensions exceeded [`MAX_DIMENSION`].
    DimensionTooLarge { width: u32, height: u32, max: u32 },
    /// A pixel byte length did not equal `width * height * 4`.
    ByteLengthMismatch { expected: usize, actual: usize },
    /// Two companion buffers disagree in size.  Pairs are `(width, height)`.
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// A parameter was non-finite or outside the range it can be clamped into.
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::ZeroDimension { width, height } => write!(
                f,
                "buffer dimensions must be non-zero (got {width}×{height})"
            ),
            MapError::DimensionTooLarge { width, height, max } => write!(
                f,
                "buffer dimensions {width}×{height} exceed MAX_DIMENSION={max}"
            ),
            MapError::ByteLengthMismatch { expected, actual } => write!(
                f,
                "pixel data length mismatch: expected {expected} bytes, got {actual}"
            ),
            MapError::DimensionMismatch {
                expected: (ew, eh),
                actual: (aw, ah),
            } => write!(
                f,
                "buffer size mismatch: expected {ew}×{eh}, got {aw}×{ah}"
            ),
            MapError::InvalidParameter {
                name,
                value,
                reason,
            } => write!(f, "invalid parameter `{name}` = {value}: {reason}"),
        }
    }
}

impl std::error::Error for MapError {}

/// Maximum allowed buffer dimension (per side).
///
/// Every stage allocates at least one full-size output, and patch-match
/// tiling holds two energy grids besides; 8192² keeps a single pipeline run
/// under ~2 GB.
pub const MAX_DIMENSION: u32 = 8192;

/// Dimension guard for buffers entering the pipeline.
#[inline]
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), MapError> {
    if width == 0 || height == 0 {
        return Err(MapError::ZeroDimension { width, height });
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(MapError::DimensionTooLarge {
            width,
            height,
            max: MAX_DIMENSION,
        });
    }
    Ok(())
}

/// Reject `value` unless it is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f32) -> Result<f32, MapError> {
    if !value.is_finite() {
        return Err(MapError::InvalidParameter {
            name,
            value: value as f64,
            reason: "must be finite",
        });
    }
    if value <= 0.0 {
        return Err(MapError::InvalidParameter {
            name,
            value: value as f64,
            reason: "must be greater than zero",
        });
    }
    Ok(value)
}

/// A stateless image-to-image transform.
///
/// Implementations read `source` and allocate a fresh output of the same
/// dimensions; the input is never modified.
pub trait MapGenerator {
    fn generate(&self, source: &PixelBuffer) -> Result<PixelBuffer, MapError>;
}

/// Handles returned after uploading a [`MapSet`] into Bevy's asset system.
pub struct MapHandles {
    /// Colour-corrected (and possibly tiled) source, sRGB.
    pub albedo: Handle<Image>,
    pub height: Handle<Image>,
    /// Tangent-space normal map.
    pub normal: Handle<Image>,
    /// Packed Occlusion/Roughness/Metallic, ready for `StandardMaterial`.
    pub orm: Handle<Image>,
    pub curvature: Handle<Image>,
}

/// Upload a [`MapSet`] into [`Assets<Image>`].
///
/// `tileable` selects repeat-wrapping samplers; otherwise the images clamp
/// to edge.  Takes `maps` by value so the pixel buffers move straight into
/// the `Image` assets.
pub fn map_to_images(maps: MapSet, tileable: bool, images: &mut Assets<Image>) -> MapHandles {
    let address_mode = if tileable {
        ImageAddressMode::Repeat
    } else {
        ImageAddressMode::ClampToEdge
    };
    let orm = maps.orm();
    let upload = |buf: PixelBuffer, format: TextureFormat, mode: MipmapMode| {
        let (w, h) = (buf.width(), buf.height());
        make_image(buf.into_raw(), w, h, format, address_mode, mode)
    };
    MapHandles {
        albedo: images.add(upload(
            maps.albedo,
            TextureFormat::Rgba8UnormSrgb,
            MipmapMode::Srgb,
        )),
        height: images.add(upload(
            maps.height,
            TextureFormat::Rgba8Unorm,
            MipmapMode::Linear,
        )),
        normal: images.add(upload(
            maps.normal,
            TextureFormat::Rgba8Unorm,
            MipmapMode::Normal,
        )),
        orm: images.add(upload(orm, TextureFormat::Rgba8Unorm, MipmapMode::Linear)),
        curvature: images.add(upload(
            maps.curvature,
            TextureFormat::Rgba8Unorm,
            MipmapMode::Linear,
        )),
    }
}

/// Controls how mipmap averages are computed for different map types.
#[derive(Clone, Copy)]
enum MipmapMode {
    /// Albedo: decode from sRGB, average in linear light, re-encode to sRGB.
    Srgb,
    /// Normal map: decode XYZ to [-1, 1], average, renormalize, re-encode.
    Normal,
    /// Height / ORM / curvature: average directly in u8 space.
    Linear,
}

fn srgb_to_linear(v: u8) -> f32 {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        std::array::from_fn(|i| {
            let c = i as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    })[v as usize]
}

/// Linear-light `[0, 1]` to sRGB `u8` through a 4096-bin table.
///
/// 256 bins would leave sRGB outputs 1–12 unreachable because the curve is
/// steep near zero.
fn linear_to_srgb(linear: f32) -> u8 {
    const N: usize = 4096;
    static LUT: OnceLock<[u8; N]> = OnceLock::new();
    let lut = LUT.get_or_init(|| {
        std::array::from_fn(|i| {
            let c = i as f32 / (N - 1) as f32;
            let encoded = if c <= 0.003_130_8 {
                c * 12.92
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            };
            (encoded * 255.0).round() as u8
        })
    });
    lut[(linear.clamp(0.0, 1.0) * (N - 1) as f32).round() as usize]
}

fn average_block(pixels: &[[u8; 4]], mode: MipmapMode) -> [u8; 4] {
    let n = pixels.len() as f32;
    match mode {
        MipmapMode::Linear => {
            let mut rgba = [0u32; 4];
            for p in pixels {
                for i in 0..4 {
                    rgba[i] += p[i] as u32;
                }
            }
            let count = pixels.len() as u32;
            rgba.map(|c| (c / count) as u8)
        }
        MipmapMode::Srgb => {
            let mut rgb = [0.0f32; 3];
            let mut a = 0u32;
            for p in pixels {
                for i in 0..3 {
                    rgb[i] += srgb_to_linear(p[i]);
                }
                a += p[3] as u32;
            }
            [
                linear_to_srgb(rgb[0] / n),
                linear_to_srgb(rgb[1] / n),
                linear_to_srgb(rgb[2] / n),
                (a / pixels.len() as u32) as u8,
            ]
        }
        MipmapMode::Normal => {
            // Averaging +X and -X without renormalising gives a zero vector,
            // which turns into black texels and NaNs in PBR shaders.
            let mut v = [0.0f32; 3];
            for p in pixels {
                for i in 0..3 {
                    v[i] += p[i] as f32 / 127.5 - 1.0;
                }
            }
            let v = v.map(|c| c / n);
            let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt().max(1e-6);
            let enc = |c: f32| (((c / len) * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
            [enc(v[0]), enc(v[1]), enc(v[2]), 255]
        }
    }
}

/// Appends every mip level below `data` using a 2×2 box filter.
///
/// Non-power-of-two sizes clamp the 2×2 block to the level boundary.
/// Returns the expanded buffer and the level count (including level 0).
fn generate_mipmaps(
    mut data: Vec<u8>,
    base_width: u32,
    base_height: u32,
    mode: MipmapMode,
) -> (Vec<u8>, u32) {
    let mut mip_level_count = 1u32;
    let mut current_width = base_width as usize;
    let mut current_height = base_height as usize;
    let mut prev_offset = 0usize;

    while current_width > 1 || current_height > 1 {
        let next_width = current_width.max(2) / 2;
        let next_height = current_height.max(2) / 2;
        let next_offset = data.len();

        data.resize(next_offset + next_width * next_height * 4, 0);

        for y in 0..next_height {
            for x in 0..next_width {
                let dst_idx = next_offset + (y * next_width + x) * 4;
                let (sx, sy) = (x * 2, y * 2);

                let mut block = [[0u8; 4]; 4];
                let mut count = 0usize;
                for dy in 0..2usize {
                    if sy + dy >= current_height {
                        continue;
                    }
                    for dx in 0..2usize {
                        if sx + dx >= current_width {
                            continue;
                        }
                        let src_idx = prev_offset + ((sy + dy) * current_width + (sx + dx)) * 4;
                        block[count].copy_from_slice(&data[src_idx..src_idx + 4]);
                        count += 1;
                    }
                }

                let avg = average_block(&block[..count], mode);
                data[dst_idx..dst_idx + 4].copy_from_slice(&avg);
            }
        }

        prev_offset = next_offset;
        current_width = next_width;
        current_height = next_height;
        mip_level_count += 1;
    }

    (data, mip_level_count)
}

fn make_image(
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: TextureFormat,
    address_mode: ImageAddressMode,
    mipmap_mode: MipmapMode,
) -> Image {
    // Base-level data already has the length `Image::new` expects.
    let mut image = Image::new(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        data,
        format,
        RenderAssetUsages::default(),
    );
    if let Some(base_data) = image.data.take() {
        let (mip_data, mip_level_count) =
            generate_mipmaps(base_data, width, height, mipmap_mode);
        image.texture_descriptor.mip_level_count = mip_level_count;
        image.data = Some(mip_data);
    }
    image.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        // wgpu requires all filter modes to be Linear when anisotropy_clamp > 1.
        mag_filter: bevy::image::ImageFilterMode::Linear,
        min_filter: bevy::image::ImageFilterMode::Linear,
        mipmap_filter: bevy::image::ImageFilterMode::Linear,
        anisotropy_clamp: 16,
        ..Default::default()
    });
    image
}
