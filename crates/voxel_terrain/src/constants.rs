//! Lattice layout constants and engine defaults.
//!
//! # Density Lattice Layout
//!
//! A chunk of `N` cells per axis stores `N + 1` samples per axis so that the
//! last sample layer coincides with the first layer of the positive neighbor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       DENSITY LATTICE (one axis)                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Sample index:  0     1     2    ...   N-1    N                          │
//! │                 │                             │                          │
//! │                 │◄──────── N cells ──────────►│                          │
//! │                 │                             │                          │
//! │                 └─ shared with -neighbor's N  └─ shared with +neighbor's 0│
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Layout
//!
//! ```text
//! Indexed [y][z][x], X innermost:
//!
//! index = (y * samples_z + z) * samples_x + x
//! ```
//!
//! # Coordinate System
//!
//! ```text
//!         +Y (up, density increases toward open air)
//!          │
//!          │
//!          └───────── +X
//!         /
//!        /
//!       +Z
//! ```

/// Default horizontal chunk edge length in cells.
pub const DEFAULT_CHUNK_EDGE: u32 = 16;

/// Default vertical chunk edge length in cells.
pub const DEFAULT_VERTICAL_CHUNK_EDGE: u32 = 16;

/// Default horizontal streaming radius in chunks.
pub const DEFAULT_HORIZONTAL_RADIUS: u32 = 4;

/// Default vertical streaming radius in chunks.
pub const DEFAULT_VERTICAL_RADIUS: u32 = 2;

/// Default number of chunks admitted into generation per tick.
pub const DEFAULT_GENERATIONS_PER_TICK: usize = 5;

/// Default number of mesh requests dispatched per tick.
pub const DEFAULT_MESH_DISPATCHES_PER_TICK: usize = 8;

/// Default cap on buffers retained by each pool shelf.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

/// Default eviction hysteresis in chunks (Manhattan).
pub const DEFAULT_EVICTION_HYSTERESIS: u32 = 2;

/// Upper bound on the streaming radii and on the eviction hysteresis.
///
/// A horizontal and vertical radius of this size already spans 65³ candidate
/// chunks.
pub const MAX_RADIUS: u32 = 32;

/// Default grace period before an out-of-range chunk is evicted.
pub const DEFAULT_EVICTION_GRACE_MS: u64 = 2_000;

/// Density value substituted for samples that are missing or non-finite.
///
/// Always compares as "outside" (never below any finite surface level).
pub const OUTSIDE_SENTINEL: f32 = f32::MAX;

/// Denominators smaller than this fall back to the edge midpoint.
pub const INTERPOLATION_EPSILON: f32 = 1e-6;

/// Number of face-adjacent neighbors of a chunk.
pub const FACE_COUNT: usize = 6;

/// Direction offsets for the 6 face neighbors, in `Face` order.
pub const FACE_OFFSETS: [(i32, i32, i32); FACE_COUNT] = [
  (-1, 0, 0), // -X
  (1, 0, 0),  // +X
  (0, -1, 0), // -Y
  (0, 1, 0),  // +Y
  (0, 0, -1), // -Z
  (0, 0, 1),  // +Z
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn face_offsets_are_unit_and_paired() {
    for pair in FACE_OFFSETS.chunks_exact(2) {
      let (a, b) = (pair[0], pair[1]);
      assert_eq!((a.0 + b.0, a.1 + b.1, a.2 + b.2), (0, 0, 0));
      assert_eq!(a.0.abs() + a.1.abs() + a.2.abs(), 1);
    }
  }

  #[test]
  fn sentinel_is_never_below_a_finite_level() {
    for level in [-1.0e30f32, -1.0, 0.0, 1.0, 1.0e30] {
      assert!(!(OUTSIDE_SENTINEL < level));
    }
  }
}
