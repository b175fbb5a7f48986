//! Measure building a bank of quadtree maps over a patterned world
//!
//! World is 256x256 with scattered wall clusters
//!

use std::sync::Arc;

use bevy_quadtree_pathfinding_plugin::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SIZE: i32 = 256;

/// Deterministic wall pattern: diagonal stripes of clusters with gaps
fn terrain() -> TerrainTypesChecker {
	Arc::new(|x, y| {
		let clustered = (x / 8 + y / 8) % 5 == 0;
		let gap = (x + y) % 16 == 0;
		if clustered && !gap {
			0
		} else {
			1
		}
	})
}

fn build(settings: Vec<QuadtreeMapSetting>) -> QuadtreeMaps {
	let mut maps = QuadtreeMaps::new(
		SIZE,
		SIZE,
		chebyshev_distance(10),
		terrain(),
		settings,
		LeafSizePolicy::new(64, None, -1, -1),
	);
	maps.build();
	maps
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("construction");
	group.significance_level(0.05).sample_size(40);
	group.bench_function("build_single_setting", |b| {
		b.iter(|| build(black_box(vec![QuadtreeMapSetting::new(1, 1)])))
	});
	group.bench_function("build_three_settings", |b| {
		b.iter(|| {
			build(black_box(vec![
				QuadtreeMapSetting::new(1, 1),
				QuadtreeMapSetting::new(2, 1),
				QuadtreeMapSetting::new(1, 0b10),
			]))
		})
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
