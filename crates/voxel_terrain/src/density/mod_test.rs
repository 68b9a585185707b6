use std::sync::Arc;

use super::*;
use crate::config::NoiseConfig;
use crate::geometry::OriginMapping;
use crate::test_utils::{CountingField, PlaneField};
use crate::types::LatticeDims;

fn geometry(mapping: OriginMapping) -> ChunkGeometry {
  ChunkGeometry::new(LatticeDims::new(8, 4), 0.5, mapping)
}

fn terrain() -> LayeredDensity {
  LayeredDensity::new(&NoiseConfig::default(), 1337).unwrap()
}

#[test]
fn test_fill_samples_every_lattice_point() {
  let pool = BufferPool::new(4);
  let field = CountingField::default();
  let geometry = geometry(OriginMapping::Corner);
  let lattice = fill_lattice(&field, ChunkCoord::ORIGIN, &geometry, &pool);
  assert_eq!(field.count(), 9 * 5 * 9);
  assert_eq!(lattice.values().len(), 9 * 5 * 9);
}

#[test]
fn test_fill_uses_world_positions() {
  let pool = BufferPool::new(4);
  let geometry = geometry(OriginMapping::Corner);
  let coord = ChunkCoord::new(0, -1, 0);
  let lattice = fill_lattice(&PlaneField::at(0.0), coord, &geometry, &pool);
  // chunk y spans [-2, 0] in steps of 0.5
  for y in 0..=4 {
    let expected = -2.0 + y as f32 * 0.5;
    assert_eq!(lattice.get(3, y, 5), expected);
  }
}

/// Face-adjacent chunks sampled independently agree bit-for-bit on the
/// shared face, on every axis and under both origin mappings.
#[test]
fn test_shared_boundary_consistency() {
  let pool = BufferPool::new(8);
  let field = terrain();
  for mapping in [OriginMapping::Corner, OriginMapping::CenteredHorizontal] {
    let geometry = geometry(mapping);
    let [sx, sy, sz] = geometry.dims.samples();
    for base in [ChunkCoord::ORIGIN, ChunkCoord::new(-3, 1, 5)] {
      let a = fill_lattice(&field, base, &geometry, &pool);

      let px = fill_lattice(&field, base.offset(1, 0, 0), &geometry, &pool);
      for y in 0..sy {
        for z in 0..sz {
          assert_eq!(a.get(sx - 1, y, z).to_bits(), px.get(0, y, z).to_bits());
        }
      }

      let py = fill_lattice(&field, base.offset(0, 1, 0), &geometry, &pool);
      for z in 0..sz {
        for x in 0..sx {
          assert_eq!(a.get(x, sy - 1, z).to_bits(), py.get(x, 0, z).to_bits());
        }
      }

      let pz = fill_lattice(&field, base.offset(0, 0, 1), &geometry, &pool);
      for y in 0..sy {
        for x in 0..sx {
          assert_eq!(a.get(x, y, sz - 1).to_bits(), pz.get(x, y, 0).to_bits());
        }
      }
    }
  }
}

#[test]
fn test_fill_reuses_pooled_lattice() {
  let pool = BufferPool::new(4);
  let geometry = geometry(OriginMapping::Corner);
  let field = PlaneField::at(0.0);
  let first = fill_lattice(&field, ChunkCoord::ORIGIN, &geometry, &pool);
  let expected = first.clone();
  pool.release_lattice(first);

  let second = fill_lattice(&field, ChunkCoord::ORIGIN, &geometry, &pool);
  assert_eq!(second, expected);
  let stats = pool.stats();
  assert_eq!(stats.hits, 1);
  assert_eq!(stats.misses, 1);
}

#[test]
fn test_field_through_smart_pointers() {
  let pool = BufferPool::new(1);
  let geometry = geometry(OriginMapping::Corner);
  let shared: Arc<dyn DensityField> = Arc::new(PlaneField::at(1.0));
  let boxed: Box<dyn DensityField> = Box::new(PlaneField::at(1.0));
  let a = fill_lattice(&shared, ChunkCoord::ORIGIN, &geometry, &pool);
  let b = fill_lattice(&boxed, ChunkCoord::ORIGIN, &geometry, &pool);
  assert_eq!(a, b);
  assert_eq!(a.get(0, 2, 0), 0.0);
}

#[test]
fn test_axis_positions_inline_up_to_32_cells() {
  let small = ChunkGeometry::new(LatticeDims::cubic(32), 1.0, OriginMapping::Corner);
  let positions = axis_positions(&small, ChunkCoord::new(1, 0, 0), 0, 33);
  assert!(!positions.spilled());
  assert_eq!(positions.first(), Some(&32.0));
  assert_eq!(positions.last(), Some(&64.0));

  // larger chunks still sample correctly, just on the heap
  let large = ChunkGeometry::new(LatticeDims::cubic(40), 1.0, OriginMapping::Corner);
  let field = CountingField::default();
  let lattice = fill_lattice(&field, ChunkCoord::ORIGIN, &large, &BufferPool::new(0));
  assert_eq!(field.count(), 41 * 41 * 41);
  assert_eq!(lattice.values().len(), 41 * 41 * 41);
}
