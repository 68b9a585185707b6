//! ChunkGeometry - chunk coordinate ↔ world space mapping.
//!
//! Sample positions are derived from global integer sample indices so the
//! samples two neighboring chunks share land on bit-identical world positions:
//!
//! ```text
//!   global = coord * cells + local          (i64, exact)
//!   world  = global * voxel_size + shift    (f64)
//! ```
//!
//! `shift` comes from the `OriginMapping`. `CenteredHorizontal` puts chunk
//! (0,0,0) around the world origin on X/Z and leaves Y at ground zero.

use glam::DVec3;
use serde::Deserialize;

use crate::types::{ChunkCoord, LatticeDims};

/// How chunk coordinates map to world-space origins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginMapping {
  /// `origin = coord * extent`.
  Corner,
  /// `origin = coord * extent - (extent.x / 2, 0, extent.z / 2)`.
  #[default]
  CenteredHorizontal,
}

impl OriginMapping {
  /// World offset applied to every chunk for the given chunk extent.
  #[inline]
  pub fn shift(self, extent: DVec3) -> DVec3 {
    match self {
      OriginMapping::Corner => DVec3::ZERO,
      OriginMapping::CenteredHorizontal => DVec3::new(-extent.x * 0.5, 0.0, -extent.z * 0.5),
    }
  }
}

/// Chunk size and world mapping shared by every chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkGeometry {
  pub dims: LatticeDims,
  pub voxel_size: f64,
  pub mapping: OriginMapping,
}

impl ChunkGeometry {
  pub fn new(dims: LatticeDims, voxel_size: f64, mapping: OriginMapping) -> Self {
    Self {
      dims,
      voxel_size,
      mapping,
    }
  }

  /// World size of one chunk.
  #[inline]
  pub fn chunk_extent(&self) -> DVec3 {
    DVec3::new(
      self.dims.cells_x as f64,
      self.dims.cells_y as f64,
      self.dims.cells_z as f64,
    ) * self.voxel_size
  }

  #[inline]
  fn shift(&self) -> DVec3 {
    self.mapping.shift(self.chunk_extent())
  }

  /// World position of the chunk's minimum corner (sample 0,0,0).
  #[inline]
  pub fn world_origin(&self, coord: ChunkCoord) -> DVec3 {
    self.sample_position(coord, 0, 0, 0)
  }

  /// World coordinate along `axis` of local sample index `local`.
  #[inline]
  pub fn axis_position(&self, coord: ChunkCoord, axis: usize, local: usize) -> f64 {
    let (chunk, cells, shift) = match axis {
      0 => (coord.x, self.dims.cells_x, self.shift().x),
      1 => (coord.y, self.dims.cells_y, self.shift().y),
      _ => (coord.z, self.dims.cells_z, self.shift().z),
    };
    let global = chunk as i64 * cells as i64 + local as i64;
    global as f64 * self.voxel_size + shift
  }

  /// World position of local sample `(x, y, z)` in chunk `coord`.
  #[inline]
  pub fn sample_position(&self, coord: ChunkCoord, x: usize, y: usize, z: usize) -> DVec3 {
    DVec3::new(
      self.axis_position(coord, 0, x),
      self.axis_position(coord, 1, y),
      self.axis_position(coord, 2, z),
    )
  }

  /// Chunk containing a world position.
  pub fn chunk_at(&self, world: DVec3) -> ChunkCoord {
    let local = (world - self.shift()) / self.chunk_extent();
    let floor = local.floor();
    ChunkCoord::new(
      saturate_i32(floor.x),
      saturate_i32(floor.y),
      saturate_i32(floor.z),
    )
  }
}

#[inline]
fn saturate_i32(v: f64) -> i32 {
  // `as` saturates and maps NaN to 0
  v as i32
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
