use super::*;

#[test]
fn test_symmetric_crossing_is_midpoint() {
  assert_eq!(crossing_t(-1.0, 1.0, 0.0), 0.5);
  let p = interpolate_edge([0.0; 3], [1.0, 0.0, 0.0], -1.0, 1.0, 0.0, true);
  assert_eq!(p, [0.5, 0.0, 0.0]);
}

#[test]
fn test_asymmetric_crossing() {
  assert_eq!(crossing_t(-3.0, 1.0, 0.0), 0.75);
  let p = interpolate_edge([0.0; 3], [0.0, 2.0, 0.0], -3.0, 1.0, 0.0, true);
  assert_eq!(p, [0.0, 1.5, 0.0]);
}

#[test]
fn test_nonzero_level() {
  assert_eq!(crossing_t(0.0, 4.0, 1.0), 0.25);
  // reversed direction
  assert_eq!(crossing_t(4.0, 0.0, 1.0), 0.75);
}

#[test]
fn test_degenerate_denominator_falls_back_to_midpoint() {
  assert_eq!(crossing_t(0.5, 0.5, 0.0), 0.5);
  assert_eq!(crossing_t(1.0, 1.0 + 1e-9, 0.0), 0.5);
}

#[test]
fn test_non_finite_falls_back_to_midpoint() {
  assert_eq!(crossing_t(f32::NAN, 1.0, 0.0), 0.5);
  assert_eq!(crossing_t(-1.0, f32::NAN, 0.0), 0.5);
  assert_eq!(crossing_t(f32::NEG_INFINITY, f32::INFINITY, 0.0), 0.5);
}

#[test]
fn test_result_is_clamped() {
  // level outside [d1, d2] would extrapolate
  assert_eq!(crossing_t(1.0, 2.0, 0.0), 0.0);
  assert_eq!(crossing_t(1.0, 2.0, 5.0), 1.0);
}

#[test]
fn test_huge_values_stay_on_edge() {
  let t = crossing_t(-1.0, f32::MAX, 0.0);
  assert!((0.0..=1.0).contains(&t));
  let t = crossing_t(-f32::MAX, f32::MAX, 0.0);
  assert!((0.0..=1.0).contains(&t));
}

#[test]
fn test_midpoint_mode_ignores_densities() {
  let p = interpolate_edge([0.0; 3], [0.0, 0.0, 1.0], -3.0, 1.0, 0.0, false);
  assert_eq!(p, [0.0, 0.0, 0.5]);
}

#[test]
fn test_edge_vertex_uses_table_corners() {
  // edge 8 runs corner 0 (0,0,0) → corner 4 (0,0,1)
  let mut corners = [1.0f32; 8];
  corners[0] = -3.0;
  assert_eq!(edge_vertex(8, &corners, 0.0, true), [0.0, 0.0, 0.75]);
  // edge 1 runs corner 1 (1,0,0) → corner 2 (1,1,0)
  let mut corners = [1.0f32; 8];
  corners[1] = -1.0;
  assert_eq!(edge_vertex(1, &corners, 0.0, true), [1.0, 0.5, 0.0]);
}
