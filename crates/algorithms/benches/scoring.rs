//! Benchmarks for the flood hazard scoring path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use estuaria_algorithms::scoring::{FloodHazardScorer, FloodRasterInputs};
use estuaria_algorithms::terrain::{distance_to_water, tpi, DistanceParams, TpiParams};
use estuaria_core::{GeoTransform, Raster, CRS};

fn create_band(size: usize, base: f64, scale: f64) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 30.0, 30.0, -30.0));
    r.set_crs(Some(CRS::utm48s()));
    for row in 0..size {
        for col in 0..size {
            let v = base + ((row * 7 + col * 13) % 200) as f64 * scale;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_tpi(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain/tpi_r5");
    for size in [128, 256, 512] {
        let dem = create_band(size, 0.0, 0.1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| tpi(black_box(&dem), TpiParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain/distance_to_water");
    for size in [256, 512, 1024] {
        let occurrence = create_band(size, -100.0, 1.0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| distance_to_water(black_box(&occurrence), DistanceParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_flood_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring/flood");
    let scorer = FloodHazardScorer::default();
    for size in [256, 512, 1024] {
        let distance = create_band(size, 10.0, 25.0);
        let elevation = create_band(size, -2.0, 0.15);
        let tpi = create_band(size, -10.0, 0.1);
        let ndvi = create_band(size, -1.0, 0.01);
        let ndwi = create_band(size, -1.0, 0.01);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                scorer
                    .score(FloodRasterInputs {
                        distance_m: black_box(&distance),
                        elevation_m: &elevation,
                        tpi: &tpi,
                        ndvi: &ndvi,
                        ndwi: &ndwi,
                    })
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tpi, bench_distance, bench_flood_score);
criterion_main!(benches);
