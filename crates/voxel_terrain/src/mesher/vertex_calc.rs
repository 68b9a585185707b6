//! Edge vertex placement.

use crate::constants::INTERPOLATION_EPSILON;
use crate::edge_table::{corner_position, EDGE_CORNERS};

/// Parametric crossing point along an edge from `d1` to `d2`.
///
/// `t = (level - d1) / (d2 - d1)`, clamped to `[0, 1]`. Falls back to the
/// midpoint when the denominator is ~0 or the result is non-finite.
#[inline]
pub fn crossing_t(d1: f32, d2: f32, level: f32) -> f32 {
  let denom = d2 - d1;
  if !(denom.abs() >= INTERPOLATION_EPSILON) {
    return 0.5;
  }
  let t = (level - d1) / denom;
  if t.is_finite() {
    t.clamp(0.0, 1.0)
  } else {
    0.5
  }
}

/// Point on segment `p1 → p2` where the density crosses `level`.
/// Midpoint when `interpolate` is false.
#[inline]
pub fn interpolate_edge(
  p1: [f32; 3],
  p2: [f32; 3],
  d1: f32,
  d2: f32,
  level: f32,
  interpolate: bool,
) -> [f32; 3] {
  let t = if interpolate {
    crossing_t(d1, d2, level)
  } else {
    0.5
  };
  [
    p1[0] + t * (p2[0] - p1[0]),
    p1[1] + t * (p2[1] - p1[1]),
    p1[2] + t * (p2[2] - p1[2]),
  ]
}

/// Vertex on cube `edge` in unit-cube coordinates, given the 8 corner
/// densities in table order.
#[inline]
pub fn edge_vertex(edge: usize, corners: &[f32; 8], level: f32, interpolate: bool) -> [f32; 3] {
  let [c0, c1] = EDGE_CORNERS[edge];
  let (c0, c1) = (c0 as usize, c1 as usize);
  interpolate_edge(
    corner_position(c0),
    corner_position(c1),
    corners[c0],
    corners[c1],
    level,
    interpolate,
  )
}

#[cfg(test)]
#[path = "vertex_calc_test.rs"]
mod vertex_calc_test;
