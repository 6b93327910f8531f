//! Face parsing benchmarks.

use cadmesh_core::{filter_faces, parse_faces, SurfaceKind, TypeFilter};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

fn feature_part(faces: usize) -> Vec<Value> {
    (0..faces)
        .map(|i| match i % 3 {
            0 => json!({
                "type": "cylinder", "face_index": i,
                "u_bounds": [0.0, 6.283], "v_bounds": [0.0, 0.01],
                "origin": [0.0, 0.0, 0.0], "axis": [0.0, 0.0, 1.0], "radius": 0.005
            }),
            1 => json!({
                "type": "plane", "face_index": i,
                "u_bounds": [-0.005, 0.005], "v_bounds": [-0.005, 0.005],
                "origin": [0.0, 0.0, 0.0], "normal": [0.0, 0.0, -1.0], "x_dir": [1.0, 0.0, 0.0]
            }),
            _ => Value::Null,
        })
        .collect()
}

fn parse_small(c: &mut Criterion) {
    let faces = feature_part(96);
    c.bench_function("parse_faces_96", |b| b.iter(|| parse_faces(black_box(&faces))));
}

fn parse_large(c: &mut Criterion) {
    let faces = feature_part(10_000);
    c.bench_function("parse_faces_10k", |b| b.iter(|| parse_faces(black_box(&faces))));
}

fn filter_large(c: &mut Criterion) {
    let faces = feature_part(10_000);
    let filter = TypeFilter::only([SurfaceKind::Cylinder]);
    c.bench_function("filter_faces_10k", |b| {
        b.iter(|| filter_faces(black_box(&faces), black_box(&filter)))
    });
}

criterion_group!(benches, parse_small, parse_large, filter_large);
criterion_main!(benches);
