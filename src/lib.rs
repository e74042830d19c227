//! `bevy_symbios_pbr` — PBR map synthesis and seamless tiling for Bevy.
//!
//! # Architecture
//! Every stage is a [`MapGenerator`]: a stateless transform from one
//! [`PixelBuffer`] (row-major RGBA8) to a fresh one of the same size.
//! [`generate_maps`] chains them: optional [`TilingProcessor`], then
//! [`ColorCorrection`], then height, normal, roughness, occlusion and
//! metalness in parallel, with curvature derived from the normal map.  The
//! result is a [`MapSet`].  Call [`map_to_images`] to upload a set into
//! [`bevy::asset::Assets<Image>`], or spawn [`async_gen::PendingMaps`] to do
//! all of it off the main thread.

pub mod async_gen;
pub mod buffer;
pub mod color;
pub mod curvature;
pub mod curve;
pub mod generator;
pub mod height;
pub mod metalness;
pub mod normal;
pub mod occlusion;
pub mod options;
pub mod pipeline;
pub mod roughness;
pub mod tiling;

pub use buffer::{BoundaryMode, PixelBuffer};
pub use color::{ColorCorrection, to_grayscale};
pub use curve::TilingCurve;
pub use generator::{MapError, MapGenerator, MapHandles, map_to_images};
pub use options::{MapOptions, TilingAlgorithm};
pub use pipeline::{MapSet, generate_maps, pack_orm};
pub use tiling::TilingProcessor;

use bevy::prelude::*;

/// Bevy plugin — registers the async-generation polling system.
pub struct SymbiosPbrPlugin;

impl Plugin for SymbiosPbrPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, async_gen::poll_map_tasks);
    }
}
