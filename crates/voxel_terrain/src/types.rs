//! Core data types: chunk coordinates, density lattices, mesh buffers.

use std::fmt;
use std::str::FromStr;

use crate::constants::{FACE_COUNT, FACE_OFFSETS};
use crate::error::ChunkKeyError;

// =============================================================================
// ChunkCoord
// =============================================================================

/// Integer chunk position in the chunk lattice.
///
/// The canonical string key is `"cx,cy,cz"` (see `Display` / `FromStr`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct ChunkCoord {
  pub x: i32,
  pub y: i32,
  pub z: i32,
}

impl ChunkCoord {
  pub const ORIGIN: Self = Self { x: 0, y: 0, z: 0 };

  pub const fn new(x: i32, y: i32, z: i32) -> Self {
    Self { x, y, z }
  }

  /// Offset by whole chunks, saturating at the coordinate range.
  #[inline]
  pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
    Self::new(
      self.x.saturating_add(dx),
      self.y.saturating_add(dy),
      self.z.saturating_add(dz),
    )
  }

  /// Face-adjacent neighbor in the given direction.
  #[inline]
  pub fn neighbor(self, face: Face) -> Self {
    let (dx, dy, dz) = face.offset();
    self.offset(dx, dy, dz)
  }

  /// All 6 face neighbors, in `Face::ALL` order.
  pub fn neighbors(self) -> [ChunkCoord; FACE_COUNT] {
    Face::ALL.map(|face| self.neighbor(face))
  }

  /// Component-wise offset `other - self`.
  #[inline]
  pub fn delta(self, other: ChunkCoord) -> (i32, i32, i32) {
    (
      other.x.saturating_sub(self.x),
      other.y.saturating_sub(self.y),
      other.z.saturating_sub(self.z),
    )
  }

  #[inline]
  pub fn manhattan_distance(self, other: ChunkCoord) -> u32 {
    self
      .x
      .abs_diff(other.x)
      .saturating_add(self.y.abs_diff(other.y))
      .saturating_add(self.z.abs_diff(other.z))
  }

  /// True if the coordinates differ by exactly 1 on one axis and match on
  /// the others.
  pub fn is_face_neighbor(self, other: ChunkCoord) -> bool {
    self.manhattan_distance(other) == 1
  }

  /// Canonical `"cx,cy,cz"` key.
  pub fn key(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for ChunkCoord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{},{},{}", self.x, self.y, self.z)
  }
}

impl FromStr for ChunkCoord {
  type Err = ChunkKeyError;

  fn from_str(key: &str) -> Result<Self, Self::Err> {
    let parts: Vec<&str> = key.split(',').collect();
    if parts.len() != 3 {
      return Err(ChunkKeyError::ComponentCount(parts.len()));
    }

    let parse = |component: &str| {
      component
        .trim()
        .parse::<i32>()
        .map_err(|_| ChunkKeyError::InvalidComponent {
          component: component.to_string(),
        })
    };

    Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
  }
}

// =============================================================================
// Face
// =============================================================================

/// Face direction of a chunk; indexes neighbor sets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
  NegX = 0,
  PosX = 1,
  NegY = 2,
  PosY = 3,
  NegZ = 4,
  PosZ = 5,
}

impl Face {
  pub const ALL: [Face; FACE_COUNT] = [
    Face::NegX,
    Face::PosX,
    Face::NegY,
    Face::PosY,
    Face::NegZ,
    Face::PosZ,
  ];

  #[inline]
  pub const fn index(self) -> usize {
    self as usize
  }

  #[inline]
  pub const fn offset(self) -> (i32, i32, i32) {
    FACE_OFFSETS[self as usize]
  }

  /// Axis this face is perpendicular to (0 = X, 1 = Y, 2 = Z).
  #[inline]
  pub const fn axis(self) -> usize {
    self as usize / 2
  }

  #[inline]
  pub const fn is_positive(self) -> bool {
    self as usize % 2 == 1
  }

  pub const fn opposite(self) -> Face {
    match self {
      Face::NegX => Face::PosX,
      Face::PosX => Face::NegX,
      Face::NegY => Face::PosY,
      Face::PosY => Face::NegY,
      Face::NegZ => Face::PosZ,
      Face::PosZ => Face::NegZ,
    }
  }

  /// Face on `axis`, negative or positive side.
  pub const fn from_axis(axis: usize, positive: bool) -> Face {
    Face::ALL[axis * 2 + positive as usize]
  }
}

// =============================================================================
// LatticeDims
// =============================================================================

/// Cell counts of a chunk per axis. Sample counts are one larger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LatticeDims {
  pub cells_x: u32,
  pub cells_y: u32,
  pub cells_z: u32,
}

impl LatticeDims {
  /// Horizontal edge for X/Z, vertical edge for Y.
  pub const fn new(horizontal: u32, vertical: u32) -> Self {
    Self {
      cells_x: horizontal,
      cells_y: vertical,
      cells_z: horizontal,
    }
  }

  pub const fn cubic(cells: u32) -> Self {
    Self::new(cells, cells)
  }

  /// Cell count along an axis (0 = X, 1 = Y, 2 = Z).
  #[inline]
  pub const fn cells(&self, axis: usize) -> u32 {
    match axis {
      0 => self.cells_x,
      1 => self.cells_y,
      _ => self.cells_z,
    }
  }

  /// Samples per axis `[x, y, z]`.
  #[inline]
  pub const fn samples(&self) -> [usize; 3] {
    [
      self.cells_x as usize + 1,
      self.cells_y as usize + 1,
      self.cells_z as usize + 1,
    ]
  }

  #[inline]
  pub const fn sample_count(&self) -> usize {
    let [sx, sy, sz] = self.samples();
    sx * sy * sz
  }

  #[inline]
  pub const fn cell_count(&self) -> usize {
    self.cells_x as usize * self.cells_y as usize * self.cells_z as usize
  }

  /// Linear `[y][z][x]` index of a sample.
  #[inline(always)]
  pub const fn index(&self, x: usize, y: usize, z: usize) -> usize {
    let [sx, _, sz] = self.samples();
    (y * sz + z) * sx + x
  }

  /// True if every axis has at least one cell.
  pub const fn is_valid(&self) -> bool {
    self.cells_x > 0 && self.cells_y > 0 && self.cells_z > 0
  }
}

// =============================================================================
// DensityLattice
// =============================================================================

/// `(N+1)³` scalar samples covering one chunk, indexed `[y][z][x]`.
#[derive(Clone, PartialEq)]
pub struct DensityLattice {
  dims: LatticeDims,
  values: Vec<f32>,
}

impl DensityLattice {
  /// Allocate a zero-filled lattice.
  pub fn zeroed(dims: LatticeDims) -> Self {
    Self {
      dims,
      values: vec![0.0; dims.sample_count()],
    }
  }

  /// Build a lattice from a function of sample indices `(x, y, z)`.
  pub fn from_fn(dims: LatticeDims, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
    let mut lattice = Self::zeroed(dims);
    let [sx, sy, sz] = dims.samples();
    for y in 0..sy {
      for z in 0..sz {
        for x in 0..sx {
          lattice.set(x, y, z, f(x, y, z));
        }
      }
    }
    lattice
  }

  #[inline]
  pub fn dims(&self) -> LatticeDims {
    self.dims
  }

  #[inline(always)]
  pub fn get(&self, x: usize, y: usize, z: usize) -> f32 {
    self.values[self.dims.index(x, y, z)]
  }

  #[inline(always)]
  pub fn set(&mut self, x: usize, y: usize, z: usize, value: f32) {
    let idx = self.dims.index(x, y, z);
    self.values[idx] = value;
  }

  pub fn values(&self) -> &[f32] {
    &self.values
  }

  pub fn values_mut(&mut self) -> &mut [f32] {
    &mut self.values
  }

  /// Zero every sample, keeping the allocation.
  pub fn reset(&mut self) {
    self.values.fill(0.0);
  }

  /// Reshape for `dims` and zero, reusing the allocation where possible.
  pub(crate) fn reshape(&mut self, dims: LatticeDims) {
    self.dims = dims;
    self.values.clear();
    self.values.resize(dims.sample_count(), 0.0);
  }

  /// Check if no cube can produce geometry: every sample is on the same side
  /// of `surface_level`. Non-finite samples count as outside.
  pub fn is_homogeneous(&self, surface_level: f32) -> bool {
    let below = |v: f32| v.is_finite() && v < surface_level;
    match self.values.first() {
      Some(&first) => {
        let first_below = below(first);
        self.values.iter().all(|&v| below(v) == first_below)
      }
      None => true,
    }
  }
}

impl fmt::Debug for DensityLattice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "DensityLattice({}x{}x{} cells)",
      self.dims.cells_x, self.dims.cells_y, self.dims.cells_z
    )
  }
}

// =============================================================================
// MeshBuffer
// =============================================================================

/// Axis-aligned bounding box.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Triangle soup: every 3 consecutive positions form one triangle.
///
/// `normals` is parallel to `positions` once normals have been computed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffer {
  pub positions: Vec<[f32; 3]>,
  pub normals: Vec<[f32; 3]>,
  pub bounds: MinMaxAABB,
}

impl MeshBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(vertices: usize) -> Self {
    Self {
      positions: Vec::with_capacity(vertices),
      normals: Vec::with_capacity(vertices),
      bounds: MinMaxAABB::empty(),
    }
  }

  /// Clear all buffers, preserving capacity.
  pub fn clear(&mut self) {
    self.positions.clear();
    self.normals.clear();
    self.bounds = MinMaxAABB::empty();
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.positions.len() / 3
  }

  /// Vertex capacity currently reserved.
  pub fn capacity(&self) -> usize {
    self.positions.capacity()
  }

  #[inline]
  pub fn push_triangle(&mut self, triangle: [[f32; 3]; 3]) {
    for vertex in triangle {
      self.bounds.encapsulate(vertex);
      self.positions.push(vertex);
    }
  }

  /// Translate every position (and the bounds) by `offset`.
  pub fn translate(&mut self, offset: [f32; 3]) {
    for p in &mut self.positions {
      p[0] += offset[0];
      p[1] += offset[1];
      p[2] += offset[2];
    }
    if self.bounds.is_valid() {
      for i in 0..3 {
        self.bounds.min[i] += offset[i];
        self.bounds.max[i] += offset[i];
      }
    }
  }

  /// Triangles as position triples.
  pub fn triangles(&self) -> impl Iterator<Item = &[[f32; 3]]> {
    self.positions.chunks_exact(3)
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
