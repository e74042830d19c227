use std::hint::black_box;

use bevy_symbios_pbr::{
    BoundaryMode, MapGenerator, MapOptions, PixelBuffer, TilingAlgorithm, TilingCurve,
    TilingProcessor, generate_maps, normal::NormalGenerator,
};
use criterion::{Criterion, criterion_group, criterion_main};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

const SIZE: u32 = 512;

/// Fractal noise photo stand-in.  Deliberately not tileable.
fn noise_source(size: u32) -> PixelBuffer {
    let fbm = Fbm::<Perlin>::new(7).set_octaves(5);
    let mut bytes = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let v = fbm.get([x as f64 / 64.0, y as f64 / 64.0]);
            let g = ((v * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0) as u8;
            bytes.extend_from_slice(&[g, g / 2 + 64, 255 - g, 255]);
        }
    }
    PixelBuffer::new(size, size, bytes).expect("valid source")
}

fn bench_pipeline(c: &mut Criterion) {
    let source = noise_source(SIZE);
    let options = MapOptions {
        tiling_enabled: true,
        is_metallic: true,
        ..MapOptions::default()
    };
    c.bench_function("pipeline_512", |b| {
        b.iter(|| generate_maps(black_box(&source), black_box(&options)))
    });
}

fn bench_tiling(c: &mut Criterion) {
    let source = noise_source(SIZE);
    for (name, algorithm) in [
        ("tiling_cross_blend_512", TilingAlgorithm::CrossBlend),
        ("tiling_mirror_512", TilingAlgorithm::Mirror),
        ("tiling_patch_match_512", TilingAlgorithm::PatchMatch),
        ("tiling_offset_512", TilingAlgorithm::Offset),
    ] {
        let processor =
            TilingProcessor::new(algorithm, 0.2, TilingCurve::Smooth).expect("valid blend");
        c.bench_function(name, |b| b.iter(|| processor.generate(black_box(&source))));
    }
}

fn bench_normal(c: &mut Criterion) {
    let source = noise_source(SIZE);
    let generator = NormalGenerator::new(2.0, BoundaryMode::Wrap).expect("valid strength");
    c.bench_function("normal_512", |b| {
        b.iter(|| generator.generate(black_box(&source)))
    });
}

criterion_group!(benches, bench_pipeline, bench_tiling, bench_normal);
criterion_main!(benches);
