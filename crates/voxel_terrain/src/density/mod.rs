//! Density fields and lattice sampling.
//!
//! A `DensityField` maps absolute world coordinates to a signed scalar:
//! negative underground, positive in open air, surface at the zero (or
//! configured) level. It must never depend on which chunk is asking, so
//! neighboring chunks sampling a shared point agree exactly.

mod terrain;

pub use terrain::LayeredDensity;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::geometry::ChunkGeometry;
use crate::pool::BufferPool;
use crate::types::{ChunkCoord, DensityLattice};

/// Pure scalar field over world space.
///
/// Implementations must be deterministic and thread-safe; workers sample
/// the same field concurrently.
pub trait DensityField: Send + Sync {
  fn sample(&self, x: f64, y: f64, z: f64) -> f32;
}

impl<F: DensityField + ?Sized> DensityField for Arc<F> {
  #[inline]
  fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
    (**self).sample(x, y, z)
  }
}

impl<F: DensityField + ?Sized> DensityField for Box<F> {
  #[inline]
  fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
    (**self).sample(x, y, z)
  }
}

impl<F: DensityField + ?Sized> DensityField for &F {
  #[inline]
  fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
    (**self).sample(x, y, z)
  }
}

/// Sample the `(N+1)³` lattice of chunk `coord` into a pooled buffer.
///
/// World positions come from `ChunkGeometry::axis_position`, so a sample on
/// a shared face is evaluated at the same world point by both chunks.
#[cfg_attr(feature = "spans", tracing::instrument(skip_all, name = "density::fill_lattice"))]
pub fn fill_lattice<F: DensityField + ?Sized>(
  field: &F,
  coord: ChunkCoord,
  geometry: &ChunkGeometry,
  pool: &BufferPool,
) -> DensityLattice {
  let dims = geometry.dims;
  let mut lattice = pool.acquire_lattice(dims);
  let [sx, sy, sz] = dims.samples();

  let xs = axis_positions(geometry, coord, 0, sx);
  let ys = axis_positions(geometry, coord, 1, sy);
  let zs = axis_positions(geometry, coord, 2, sz);

  let values = lattice.values_mut();
  let mut idx = 0;
  for &wy in &ys {
    for &wz in &zs {
      for &wx in &xs {
        values[idx] = field.sample(wx, wy, wz);
        idx += 1;
      }
    }
  }
  lattice
}

/// World positions of the samples along one axis. Chunks up to 32 cells on
/// an edge stay on the stack.
type AxisPositions = SmallVec<[f64; 33]>;

#[inline]
fn axis_positions(
  geometry: &ChunkGeometry,
  coord: ChunkCoord,
  axis: usize,
  count: usize,
) -> AxisPositions {
  (0..count).map(|i| geometry.axis_position(coord, axis, i)).collect()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
