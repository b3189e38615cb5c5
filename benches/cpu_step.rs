//! Benchmarks for the CPU boid kernel and payload packing.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use flockpaint::boid::spawn_boids;
use flockpaint::cpu::{paint_mask, step_boids, CpuMask};
use flockpaint::{BoidUniforms, BrushState, PaintUniforms, SimulationParameters, Vec2};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn brush() -> BrushState {
    BrushState {
        cursor: Vec2::new(WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0),
        radius: 48.0,
        weight: 1.0,
        mass_sign: 1,
        enabled: true,
    }
}

fn bench_step_boids(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_boids");
    group.sample_size(20);

    let mut mask = CpuMask::new(WIDTH, HEIGHT);
    paint_mask(&mut mask, &PaintUniforms::new(&brush(), (WIDTH, HEIGHT)));

    for count in [256u32, 1_024, 4_096] {
        let params = SimulationParameters {
            count,
            ..SimulationParameters::flocking_preset()
        };
        let uniforms = BoidUniforms::pack(&params, 1.0 / 120.0, (WIDTH, HEIGHT), &brush());
        let mut rng = SmallRng::seed_from_u64(7);
        let boids = spawn_boids(count, WIDTH, HEIGHT, &mut rng);

        group.bench_with_input(BenchmarkId::from_parameter(count), &boids, |b, boids| {
            let mut records = boids.clone();
            b.iter(|| step_boids(black_box(&mut records), &mask, &uniforms))
        });
    }

    group.finish();
}

fn bench_paint(c: &mut Criterion) {
    let mut group = c.benchmark_group("paint_mask");

    for radius in [8.0f32, 64.0, 256.0] {
        let dab = PaintUniforms::new(
            &BrushState {
                radius,
                ..brush()
            },
            (WIDTH, HEIGHT),
        );
        group.bench_with_input(BenchmarkId::from_parameter(radius), &dab, |b, dab| {
            let mut mask = CpuMask::new(WIDTH, HEIGHT);
            b.iter(|| paint_mask(black_box(&mut mask), dab))
        });
    }

    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let params = SimulationParameters::default();
    let brush = brush();
    c.bench_function("boid_uniforms_pack", |b| {
        b.iter(|| {
            black_box(BoidUniforms::pack(
                black_box(&params),
                black_box(1.0 / 120.0),
                (WIDTH, HEIGHT),
                &brush,
            ))
        })
    });
}

criterion_group!(benches, bench_step_boids, bench_paint, bench_pack);
criterion_main!(benches);
