//! The full map pipeline.
//!
//! ```text
//! source ─▶ [tiling] ─▶ colour correction ─┬─▶ height
//!                                           ├─▶ normal ─▶ curvature
//!                                           ├─▶ roughness
//!                                           ├─▶ occlusion
//!                                           └─▶ metalness
//! ```
//!
//! Tiling and colour correction form a strict chain.  The five generators
//! then fan out from the corrected buffer as concurrent [`rayon::join`]
//! tasks; curvature runs inside the normal task because it consumes the
//! normal map.

use bevy::log::debug;

use crate::{
    buffer::PixelBuffer,
    color::ColorCorrection,
    curvature::CurvatureGenerator,
    generator::{MapError, MapGenerator},
    height::HeightGenerator,
    metalness::MetalnessGenerator,
    normal::NormalGenerator,
    occlusion::OcclusionGenerator,
    options::MapOptions,
    roughness::RoughnessGenerator,
    tiling::TilingProcessor,
};

/// Every map derived from one source, all with the source's dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSet {
    /// Colour-corrected (and, if enabled, tiled) source.
    pub albedo: PixelBuffer,
    pub height: PixelBuffer,
    pub normal: PixelBuffer,
    pub roughness: PixelBuffer,
    pub occlusion: PixelBuffer,
    pub metalness: PixelBuffer,
    pub curvature: PixelBuffer,
}

impl MapSet {
    pub fn width(&self) -> u32 {
        self.albedo.width()
    }

    pub fn height(&self) -> u32 {
        self.albedo.height()
    }

    /// Occlusion, roughness and metalness packed into R, G and B.
    pub fn orm(&self) -> PixelBuffer {
        interleave_orm(&self.occlusion, &self.roughness, &self.metalness)
    }
}

/// Pack three grayscale maps into one ORM buffer (`R` = occlusion,
/// `G` = roughness, `B` = metalness, `A` = 255), the channel layout Bevy's
/// `StandardMaterial` samples.
///
/// Each input contributes its red channel.
pub fn pack_orm(
    occlusion: &PixelBuffer,
    roughness: &PixelBuffer,
    metalness: &PixelBuffer,
) -> Result<PixelBuffer, MapError> {
    occlusion.ensure_same_size(roughness)?;
    occlusion.ensure_same_size(metalness)?;
    Ok(interleave_orm(occlusion, roughness, metalness))
}

fn interleave_orm(o: &PixelBuffer, r: &PixelBuffer, m: &PixelBuffer) -> PixelBuffer {
    let bytes = o
        .pixels()
        .chunks_exact(4)
        .zip(r.pixels().chunks_exact(4))
        .zip(m.pixels().chunks_exact(4))
        .flat_map(|((o, r), m)| [o[0], r[0], m[0], 255])
        .collect();
    PixelBuffer::from_parts(o.width(), o.height(), bytes)
}

/// Run the whole pipeline on `source`.
///
/// `options` is sanitised first: continuous values are clamped into range,
/// and non-positive strengths or an out-of-range tiling blend are rejected
/// before any pixel work starts.
pub fn generate_maps(source: &PixelBuffer, options: &MapOptions) -> Result<MapSet, MapError> {
    let opts = options.sanitized()?;
    debug!(
        "generating maps for {}×{} source (tiling: {})",
        source.width(),
        source.height(),
        if opts.tiling_enabled {
            format!("{:?}", opts.tiling_algorithm)
        } else {
            "off".to_string()
        }
    );

    // Build every generator up front so parameter errors surface before work.
    let tiling = TilingProcessor::from_options(&opts)?;
    let correction = ColorCorrection::new(&opts);
    let height = HeightGenerator::new(opts.contrast);
    let normal = NormalGenerator::new(opts.intensity, opts.edge_mode)?;
    let curvature = CurvatureGenerator::new(opts.edge_mode);
    let roughness = RoughnessGenerator::new(opts.invert);
    let occlusion = OcclusionGenerator::new(opts.ao_strength, opts.edge_mode)?;
    let metalness = MetalnessGenerator::new(opts.is_metallic, opts.metalness_base);
    let stages = MapStages {
        height: &height,
        normal: &normal,
        curvature: &curvature,
        roughness: &roughness,
        occlusion: &occlusion,
        metalness: &metalness,
    };

    let tiled = if opts.tiling_enabled {
        Some(tiling.generate(source)?)
    } else {
        None
    };
    let albedo = correction.generate(tiled.as_ref().unwrap_or(source))?;
    drop(tiled);

    stages.run(albedo)
}

/// The generators that fan out from the corrected albedo.
struct MapStages<'a> {
    height: &'a (dyn MapGenerator + Sync),
    normal: &'a (dyn MapGenerator + Sync),
    /// Fed with the normal map, not the albedo.
    curvature: &'a (dyn MapGenerator + Sync),
    roughness: &'a (dyn MapGenerator + Sync),
    occlusion: &'a (dyn MapGenerator + Sync),
    metalness: &'a (dyn MapGenerator + Sync),
}

impl MapStages<'_> {
    fn run(&self, albedo: PixelBuffer) -> Result<MapSet, MapError> {
        let ((height, normal), (roughness, (occlusion, metalness))) = rayon::join(
            || {
                rayon::join(
                    || self.height.generate(&albedo),
                    || -> Result<_, MapError> {
                        let normal = self.normal.generate(&albedo)?;
                        let curvature = self.curvature.generate(&normal)?;
                        Ok((normal, curvature))
                    },
                )
            },
            || {
                rayon::join(
                    || self.roughness.generate(&albedo),
                    || {
                        rayon::join(
                            || self.occlusion.generate(&albedo),
                            || self.metalness.generate(&albedo),
                        )
                    },
                )
            },
        );
        let (normal, curvature) = normal?;

        Ok(MapSet {
            height: height?,
            normal,
            roughness: roughness?,
            occlusion: occlusion?,
            metalness: metalness?,
            curvature,
            albedo,
        })
    }
}
