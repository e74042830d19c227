//! `map_viewer` — synthesises a noise "photo", runs the full map pipeline in
//! the background and shows albedo, normal, ORM and curvature side by side.
//!
//! Run with:
//!   cargo run --example map_viewer

use bevy::prelude::*;
use bevy_symbios_pbr::{
    MapOptions, PixelBuffer, SymbiosPbrPlugin, TilingAlgorithm,
    async_gen::{MapsReady, PendingMaps},
};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

const TEX_SIZE: u32 = 256;
const SPACING: f32 = TEX_SIZE as f32 + 20.0;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "bevy_symbios_pbr — map viewer".into(),
                resolution: ((SPACING * 4.0 + 40.0) as u32, (TEX_SIZE + 80)).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(SymbiosPbrPlugin)
        .add_systems(Startup, spawn_task)
        .add_systems(Update, show_ready_maps)
        .run();
}

/// Bark-like stripes over fractal noise; the edges do not match.
fn synth_source(size: u32) -> PixelBuffer {
    let fbm = Fbm::<Perlin>::new(3).set_octaves(6);
    let mut bytes = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let (u, v) = (x as f64 / size as f64, y as f64 / size as f64);
            let n = fbm.get([u * 6.0, v * 1.5]) * 0.5 + 0.5;
            let stripe = ((u * 18.0 + n * 4.0).sin() * 0.5 + 0.5) * 0.4;
            let g = ((n * 0.6 + stripe).clamp(0.0, 1.0) * 255.0) as u8;
            bytes.extend_from_slice(&[g, (g as f32 * 0.75) as u8, (g as f32 * 0.5) as u8, 255]);
        }
    }
    match PixelBuffer::new(size, size, bytes) {
        Ok(buf) => buf,
        Err(e) => panic!("source synthesis produced a bad buffer: {e}"),
    }
}

fn spawn_task(mut commands: Commands) {
    commands.spawn(Camera2d);
    commands.spawn(PendingMaps::spawn(
        synth_source(TEX_SIZE),
        MapOptions {
            tiling_enabled: true,
            tiling_algorithm: TilingAlgorithm::CrossBlend,
            intensity: 2.0,
            contrast: 0.3,
            delight_amount: 0.4,
            ..MapOptions::default()
        },
    ));
}

fn show_ready_maps(
    mut commands: Commands,
    ready: Query<(Entity, &MapsReady)>,
    mut shown: Local<Vec<Entity>>,
) {
    for (entity, maps) in &ready {
        if shown.contains(&entity) {
            continue;
        }
        shown.push(entity);

        let handles = &maps.0;
        let panels = [
            ("Albedo", handles.albedo.clone()),
            ("Normal", handles.normal.clone()),
            ("ORM", handles.orm.clone()),
            ("Curvature", handles.curvature.clone()),
        ];
        for (i, (label, image)) in panels.into_iter().enumerate() {
            let x = (i as f32 - 1.5) * SPACING;
            commands.spawn((
                Sprite {
                    image,
                    custom_size: Some(Vec2::splat(TEX_SIZE as f32)),
                    ..default()
                },
                Transform::from_translation(Vec3::new(x, 0.0, 0.0)),
            ));
            commands.spawn((
                Text2d::new(label),
                Transform::from_translation(Vec3::new(x, -(TEX_SIZE as f32 * 0.5 + 18.0), 0.0)),
            ));
        }
    }
}
