//! Face normals for the unshared triangle soup.
//!
//! Every vertex belongs to exactly one triangle, so accumulating face
//! normals per vertex reduces to the triangle's own normal.

use glam::Vec3;

use crate::types::MeshBuffer;

const FALLBACK_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// Unnormalized normal of triangle `a, b, c` (counter-clockwise front).
#[inline]
pub fn face_cross(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Vec3 {
  let a = Vec3::from_array(a);
  (Vec3::from_array(b) - a).cross(Vec3::from_array(c) - a)
}

/// Unit normal of triangle `a, b, c`. Degenerate or non-finite triangles
/// get `+Y`.
#[inline]
pub fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
  let n = face_cross(a, b, c);
  let len_sq = n.length_squared();
  if !(len_sq.is_finite() && len_sq > 1e-20) {
    return FALLBACK_NORMAL;
  }
  (n * len_sq.sqrt().recip()).to_array()
}

/// Recompute `mesh.normals` from positions.
pub fn compute_flat_normals(mesh: &mut MeshBuffer) {
  mesh.normals.clear();
  mesh.normals.reserve(mesh.positions.len());
  for tri in mesh.positions.chunks_exact(3) {
    let n = face_normal(tri[0], tri[1], tri[2]);
    mesh.normals.extend_from_slice(&[n, n, n]);
  }
}
