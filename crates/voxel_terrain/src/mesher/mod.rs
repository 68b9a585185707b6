//! Marching cubes isosurface extraction.
//!
//! # Pipeline
//!
//! ```text
//!   lattice + NeighborSet
//!        │
//!        ▼
//!   resolve samples     boundary samples read from the face neighbor,
//!        │              or OUTSIDE_SENTINEL when it is missing
//!        ▼
//!   homogeneous? ──yes──► empty mesh
//!        │ no
//!        ▼
//!   for each of N³ cubes:
//!     mask = bits of corners < surface_level
//!     mask 0 / 255 ──► skip
//!     EDGE_TABLE[mask] ──► edge vertices (interpolated or midpoint)
//!     TRI_TABLE[mask]  ──► unshared triangles, oriented toward air
//!        │
//!        ▼
//!   translate by chunk world origin
//! ```
//!
//! # Boundary samples
//!
//! A sample with index 0 or N on some axis lies on a chunk face. When the
//! neighbor across that face is supplied, its coincident sample is used
//! (local 0 ↔ neighbor N, local N ↔ neighbor 0). A sample on several faces
//! needs every involved neighbor and reads from the first in X, Y, Z order.
//! A missing neighbor (or one with different dimensions) yields the outside
//! sentinel, trading a visible seam for availability.
//!
//! Non-finite densities are treated as outside.

mod neighbors;
mod normals;
mod vertex_calc;

pub use neighbors::{NeighborLattices, NeighborSet};
pub use normals::{compute_flat_normals, face_normal};
pub use vertex_calc::{crossing_t, edge_vertex, interpolate_edge};

use glam::{DVec3, Vec3};

use crate::config::TerrainConfig;
use crate::constants::{FACE_COUNT, OUTSIDE_SENTINEL};
use crate::edge_table::{corner_position, CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};
use crate::pool::BufferPool;
use crate::types::{DensityLattice, Face, MeshBuffer};

/// Extraction parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshSettings {
  /// Corners strictly below this level are inside.
  pub surface_level: f32,
  /// Interpolate along edges; false places vertices at edge midpoints.
  pub interpolate: bool,
  /// World units per lattice cell.
  pub voxel_size: f32,
}

impl Default for MeshSettings {
  fn default() -> Self {
    Self {
      surface_level: 0.0,
      interpolate: true,
      voxel_size: 1.0,
    }
  }
}

impl MeshSettings {
  pub fn from_config(config: &TerrainConfig) -> Self {
    Self {
      surface_level: config.surface_level,
      interpolate: config.interpolate,
      voxel_size: config.voxel_size as f32,
    }
  }

  pub fn with_surface_level(mut self, level: f32) -> Self {
    self.surface_level = level;
    self
  }

  pub fn with_interpolation(mut self, interpolate: bool) -> Self {
    self.interpolate = interpolate;
    self
  }

  pub fn with_voxel_size(mut self, voxel_size: f32) -> Self {
    self.voxel_size = voxel_size;
    self
  }
}

/// Extract the isosurface into a freshly allocated buffer.
pub fn extract(
  lattice: &DensityLattice,
  neighbors: &NeighborSet<'_>,
  settings: &MeshSettings,
  origin: DVec3,
) -> MeshBuffer {
  let mut mesh = MeshBuffer::new();
  extract_into(lattice, neighbors, settings, origin, &mut mesh);
  mesh
}

/// Extract the isosurface into `out`, replacing its contents.
///
/// Positions are in world space (`origin` + local cell coordinates scaled by
/// `voxel_size`). `normals` is filled in parallel with `positions`.
pub fn extract_into(
  lattice: &DensityLattice,
  neighbors: &NeighborSet<'_>,
  settings: &MeshSettings,
  origin: DVec3,
  out: &mut MeshBuffer,
) {
  out.clear();
  if !lattice.dims().is_valid() {
    return;
  }
  let mut samples = vec![0.0; lattice.dims().sample_count()];
  extract_with_scratch(lattice, neighbors, settings, origin, &mut samples, out);
}

/// `extract_into` with the resolved-sample scratch borrowed from `pool`.
///
/// Workers use this so repeated extractions reuse one lattice-sized buffer
/// per dimension instead of allocating for each chunk.
pub fn extract_pooled(
  lattice: &DensityLattice,
  neighbors: &NeighborSet<'_>,
  settings: &MeshSettings,
  origin: DVec3,
  pool: &BufferPool,
  out: &mut MeshBuffer,
) {
  out.clear();
  if !lattice.dims().is_valid() {
    return;
  }
  let mut scratch = pool.acquire_lattice(lattice.dims());
  extract_with_scratch(lattice, neighbors, settings, origin, scratch.values_mut(), out);
  pool.release_lattice(scratch);
}

#[cfg_attr(feature = "spans", tracing::instrument(skip_all, name = "mesher::extract"))]
fn extract_with_scratch(
  lattice: &DensityLattice,
  neighbors: &NeighborSet<'_>,
  settings: &MeshSettings,
  origin: DVec3,
  samples: &mut [f32],
  out: &mut MeshBuffer,
) {
  resolve_samples(lattice, neighbors, samples);
  let level = settings.surface_level;
  let first_below = samples.first().is_some_and(|&v| v < level);
  if samples.iter().all(|&v| (v < level) == first_below) {
    return;
  }

  march(lattice, samples, settings, out);
  out.translate(origin.as_vec3().to_array());
}

/// Write the lattice values into `values` with non-finite samples replaced
/// and face samples resolved against the neighbor set.
///
/// `values` must hold exactly `sample_count()` entries; every one is
/// overwritten.
fn resolve_samples(lattice: &DensityLattice, neighbors: &NeighborSet<'_>, values: &mut [f32]) {
  let dims = lattice.dims();
  let cells = [
    dims.cells_x as usize,
    dims.cells_y as usize,
    dims.cells_z as usize,
  ];

  let mut faces: [Option<&DensityLattice>; FACE_COUNT] = [None; FACE_COUNT];
  for face in Face::ALL {
    faces[face.index()] = neighbors.get(face).filter(|n| n.dims() == dims);
  }

  for (dst, &src) in values.iter_mut().zip(lattice.values()) {
    *dst = sanitize(src);
  }
  let [sx, sy, sz] = dims.samples();
  for y in 0..sy {
    for z in 0..sz {
      for x in 0..sx {
        let p = [x, y, z];
        let on_face = (0..3).any(|axis| p[axis] == 0 || p[axis] == cells[axis]);
        if on_face {
          values[dims.index(x, y, z)] = boundary_sample(p, cells, &faces);
        }
      }
    }
  }
}

fn boundary_sample(
  p: [usize; 3],
  cells: [usize; 3],
  faces: &[Option<&DensityLattice>; FACE_COUNT],
) -> f32 {
  let mut value = OUTSIDE_SENTINEL;
  let mut resolved = false;
  for axis in 0..3 {
    let positive = if p[axis] == 0 {
      false
    } else if p[axis] == cells[axis] {
      true
    } else {
      continue;
    };
    let face = Face::from_axis(axis, positive);
    let Some(neighbor) = faces[face.index()] else {
      return OUTSIDE_SENTINEL;
    };
    if !resolved {
      let mut q = p;
      q[axis] = if positive { 0 } else { cells[axis] };
      value = sanitize(neighbor.get(q[0], q[1], q[2]));
      resolved = true;
    }
  }
  value
}

#[inline]
fn sanitize(v: f32) -> f32 {
  if v.is_finite() {
    v
  } else {
    OUTSIDE_SENTINEL
  }
}

fn march(lattice: &DensityLattice, samples: &[f32], settings: &MeshSettings, out: &mut MeshBuffer) {
  let dims = lattice.dims();
  let level = settings.surface_level;
  let scale = settings.voxel_size;

  for y in 0..dims.cells_y as usize {
    for z in 0..dims.cells_z as usize {
      for x in 0..dims.cells_x as usize {
        let mut corners = [0.0f32; 8];
        let mut mask = 0usize;
        for (i, o) in CORNER_OFFSETS.iter().enumerate() {
          let d = samples[dims.index(x + o[0], y + o[1], z + o[2])];
          corners[i] = d;
          if d < level {
            mask |= 1 << i;
          }
        }
        if mask == 0 || mask == 0xff {
          continue;
        }

        let edges = EDGE_TABLE[mask];
        let base = [x as f32, y as f32, z as f32];
        let mut verts = [[0.0f32; 3]; 12];
        for (edge, vert) in verts.iter_mut().enumerate() {
          if edges & (1 << edge) != 0 {
            let v = edge_vertex(edge, &corners, level, settings.interpolate);
            *vert = [
              (base[0] + v[0]) * scale,
              (base[1] + v[1]) * scale,
              (base[2] + v[2]) * scale,
            ];
          }
        }

        for tri in TRI_TABLE[mask].chunks_exact(3) {
          if tri[0] < 0 {
            break;
          }
          let e = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
          let (a, mut b, mut c) = (verts[e[0]], verts[e[1]], verts[e[2]]);
          let outward = outward_hint(mask, e);
          if normals::face_cross(a, b, c).dot(outward) < 0.0 {
            std::mem::swap(&mut b, &mut c);
          }
          out.push_triangle([a, b, c]);
          let n = face_normal(a, b, c);
          out.normals.extend_from_slice(&[n, n, n]);
        }
      }
    }
  }
}

/// Sum of inside → outside directions along the triangle's three edges.
#[inline]
fn outward_hint(mask: usize, edges: [usize; 3]) -> Vec3 {
  let mut dir = Vec3::ZERO;
  for edge in edges {
    let [c0, c1] = EDGE_CORNERS[edge];
    let (c0, c1) = (c0 as usize, c1 as usize);
    let p0 = Vec3::from_array(corner_position(c0));
    let p1 = Vec3::from_array(corner_position(c1));
    if mask & (1 << c0) != 0 {
      dir += p1 - p0;
    } else {
      dir += p0 - p1;
    }
  }
  dir
}
