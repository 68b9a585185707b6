//! Benchmarks for lattice fill and marching cubes extraction.
//!
//! Workloads use the default 16-cell chunk (17³ samples) and a 32-cell chunk.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::DVec3;
use voxel_terrain::{
  extract, extract_into, extract_pooled, fill_lattice, BufferPool, ChunkCoord, ChunkGeometry,
  DensityLattice, LatticeDims, LayeredDensity, MeshBuffer, MeshSettings, NeighborSet, NoiseConfig,
  OriginMapping,
};

/// Sphere of `radius` cells around the lattice center.
fn sphere_lattice(cells: u32, radius: f32) -> DensityLattice {
  let c = cells as f32 * 0.5;
  DensityLattice::from_fn(LatticeDims::cubic(cells), |x, y, z| {
    let dx = x as f32 - c;
    let dy = y as f32 - c;
    let dz = z as f32 - c;
    (dx * dx + dy * dy + dz * dz).sqrt() - radius
  })
}

fn terrain_lattice(cells: u32) -> DensityLattice {
  let field = LayeredDensity::new(&NoiseConfig::default(), 1337).expect("default noise is valid");
  let geometry = ChunkGeometry::new(LatticeDims::cubic(cells), 1.0, OriginMapping::Corner);
  let pool = BufferPool::new(0);
  // straddle ground level so the surface crosses the chunk
  fill_lattice(&field, ChunkCoord::new(0, -1, 0), &geometry, &pool)
}

// ============================================================================
// Extraction
// ============================================================================

fn bench_extract_sphere(c: &mut Criterion) {
  let mut group = c.benchmark_group("extract_sphere");
  let settings = MeshSettings::default();

  for cells in [16u32, 32] {
    let lattice = sphere_lattice(cells, cells as f32 * 0.4);
    let neighbors = NeighborSet::uniform(&lattice);
    group.throughput(Throughput::Elements(LatticeDims::cubic(cells).cell_count() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(cells), &cells, |b, _| {
      b.iter(|| {
        let mesh = extract(black_box(&lattice), &neighbors, &settings, DVec3::ZERO);
        black_box(mesh.vertex_count())
      })
    });
  }

  group.finish();
}

fn bench_extract_terrain_reused(c: &mut Criterion) {
  let lattice = terrain_lattice(16);
  let settings = MeshSettings::default();
  let mut mesh = MeshBuffer::new();

  c.bench_function("extract_into terrain 16³ (reused buffer)", |b| {
    b.iter(|| {
      extract_into(
        black_box(&lattice),
        &NeighborSet::empty(),
        &settings,
        DVec3::ZERO,
        &mut mesh,
      );
      black_box(mesh.vertex_count())
    })
  });

  let pool = BufferPool::new(4);
  c.bench_function("extract_pooled terrain 16³ (reused buffer and scratch)", |b| {
    b.iter(|| {
      extract_pooled(
        black_box(&lattice),
        &NeighborSet::empty(),
        &settings,
        DVec3::ZERO,
        &pool,
        &mut mesh,
      );
      black_box(mesh.vertex_count())
    })
  });
}

fn bench_midpoint_vs_interpolated(c: &mut Criterion) {
  let mut group = c.benchmark_group("extract_vertex_mode");
  let lattice = sphere_lattice(16, 6.0);
  let neighbors = NeighborSet::uniform(&lattice);

  for interpolate in [true, false] {
    let settings = MeshSettings::default().with_interpolation(interpolate);
    let name = if interpolate { "interpolated" } else { "midpoint" };
    group.bench_function(name, |b| {
      b.iter(|| black_box(extract(&lattice, &neighbors, &settings, DVec3::ZERO)))
    });
  }

  group.finish();
}

// ============================================================================
// Lattice fill
// ============================================================================

fn bench_fill_lattice(c: &mut Criterion) {
  let mut group = c.benchmark_group("fill_lattice");
  let field = LayeredDensity::new(&NoiseConfig::default(), 1337).expect("default noise is valid");
  let pool = BufferPool::default();

  for cells in [16u32, 32] {
    let geometry = ChunkGeometry::new(LatticeDims::cubic(cells), 1.0, OriginMapping::default());
    group.throughput(Throughput::Elements(geometry.dims.sample_count() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(cells), &cells, |b, _| {
      b.iter(|| {
        let lattice = fill_lattice(&field, ChunkCoord::new(3, 0, -2), &geometry, &pool);
        let first = lattice.values()[0];
        pool.release_lattice(lattice);
        black_box(first)
      })
    });
  }

  group.finish();
}

criterion_group!(
  benches,
  bench_extract_sphere,
  bench_extract_terrain_reused,
  bench_midpoint_vs_interpolated,
  bench_fill_lattice
);
criterion_main!(benches);
