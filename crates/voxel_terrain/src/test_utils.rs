//! Test fixtures: analytic density fields and lattice builders.

use std::sync::atomic::{AtomicUsize, Ordering};

use glam::DVec3;

use crate::density::DensityField;
use crate::types::{DensityLattice, LatticeDims};

// =============================================================================
// Fixture density fields
// =============================================================================

/// Horizontal plane: `density = y - height`. Solid below, air above.
pub struct PlaneField {
  pub height: f64,
}

impl PlaneField {
  pub fn at(height: f64) -> Self {
    Self { height }
  }
}

impl DensityField for PlaneField {
  fn sample(&self, _x: f64, y: f64, _z: f64) -> f32 {
    (y - self.height) as f32
  }
}

/// Sphere: negative inside, positive outside.
pub struct SphereField {
  pub center: DVec3,
  pub radius: f64,
}

impl SphereField {
  pub fn new(center: DVec3, radius: f64) -> Self {
    Self { center, radius }
  }
}

impl DensityField for SphereField {
  fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
    ((DVec3::new(x, y, z) - self.center).length() - self.radius) as f32
  }
}

/// Same value everywhere.
pub struct ConstantField(pub f32);

impl DensityField for ConstantField {
  fn sample(&self, _x: f64, _y: f64, _z: f64) -> f32 {
    self.0
  }
}

/// Plane field that returns NaN for `x < 0` and +inf for `z < 0`.
pub struct PoisonedField;

impl DensityField for PoisonedField {
  fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
    if x < 0.0 {
      f32::NAN
    } else if z < 0.0 {
      f32::INFINITY
    } else {
      y as f32
    }
  }
}

/// Panics on every sample. Exercises the worker panic boundary.
pub struct PanicField;

impl DensityField for PanicField {
  fn sample(&self, _x: f64, _y: f64, _z: f64) -> f32 {
    panic!("density field exploded");
  }
}

/// Plane field that counts how many samples were taken.
#[derive(Default)]
pub struct CountingField {
  pub samples: AtomicUsize,
}

impl CountingField {
  pub fn count(&self) -> usize {
    self.samples.load(Ordering::Relaxed)
  }
}

impl DensityField for CountingField {
  fn sample(&self, _x: f64, y: f64, _z: f64) -> f32 {
    self.samples.fetch_add(1, Ordering::Relaxed);
    y as f32
  }
}

// =============================================================================
// Lattice builders (local sample coordinates)
// =============================================================================

/// Lattice with `value = y - height` in local sample units.
pub fn plane_lattice(dims: LatticeDims, height: f32) -> DensityLattice {
  DensityLattice::from_fn(dims, |_, y, _| y as f32 - height)
}

/// Lattice filled with a single value.
pub fn constant_lattice(dims: LatticeDims, value: f32) -> DensityLattice {
  DensityLattice::from_fn(dims, |_, _, _| value)
}

/// Lattice with a sphere of `radius` around the lattice center.
pub fn sphere_lattice(dims: LatticeDims, radius: f32) -> DensityLattice {
  let center = [
    dims.cells_x as f32 * 0.5,
    dims.cells_y as f32 * 0.5,
    dims.cells_z as f32 * 0.5,
  ];
  DensityLattice::from_fn(dims, |x, y, z| {
    let dx = x as f32 - center[0];
    let dy = y as f32 - center[1];
    let dz = z as f32 - center[2];
    (dx * dx + dy * dy + dz * dz).sqrt() - radius
  })
}
