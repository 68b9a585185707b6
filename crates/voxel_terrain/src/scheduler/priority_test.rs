use super::*;

#[test]
fn test_reference_offsets_along_x() {
  let viewer = ChunkCoord::ORIGIN;
  assert_eq!(
    PriorityClass::classify(viewer, ChunkCoord::new(1, 0, 0)),
    PriorityClass::Immediate
  );
  assert_eq!(
    PriorityClass::classify(viewer, ChunkCoord::new(3, 0, 0)),
    PriorityClass::Adjacent
  );
  assert_eq!(
    PriorityClass::classify(viewer, ChunkCoord::new(5, 0, 0)),
    PriorityClass::Near
  );
  assert_eq!(
    PriorityClass::classify(viewer, ChunkCoord::new(8, 0, 0)),
    PriorityClass::Far
  );
}

#[test]
fn test_viewer_chunk_is_immediate() {
  assert_eq!(PriorityClass::from_offset(0, 0, 0), PriorityClass::Immediate);
  assert_eq!(PriorityClass::from_offset(0, -1, 0), PriorityClass::Immediate);
}

#[test]
fn test_same_layer_square_rules() {
  // (2,0,2): manhattan 4, but same layer within 2
  assert_eq!(PriorityClass::from_offset(2, 0, 2), PriorityClass::Adjacent);
  // off-layer with the same horizontal footprint falls through
  assert_eq!(PriorityClass::from_offset(2, 1, 2), PriorityClass::Near);
  // (4,0,4): manhattan 8, same layer within 4
  assert_eq!(PriorityClass::from_offset(4, 0, 4), PriorityClass::Near);
  assert_eq!(PriorityClass::from_offset(4, 1, 4), PriorityClass::Far);
}

#[test]
fn test_manhattan_rules_off_layer() {
  assert_eq!(PriorityClass::from_offset(1, 1, 1), PriorityClass::Adjacent);
  assert_eq!(PriorityClass::from_offset(2, 2, 1), PriorityClass::Near);
  assert_eq!(PriorityClass::from_offset(3, -2, 2), PriorityClass::Medium);
  assert_eq!(PriorityClass::from_offset(-6, 1, 0), PriorityClass::Medium);
  assert_eq!(PriorityClass::from_offset(0, 8, 0), PriorityClass::Far);
}

#[test]
fn test_ordering_and_rank() {
  let mut classes = PriorityClass::ALL;
  classes.reverse();
  classes.sort();
  assert_eq!(classes, PriorityClass::ALL);
  assert!(PriorityClass::Immediate < PriorityClass::Far);
  assert_eq!(PriorityClass::Medium.rank(), 3);
}

#[test]
fn test_extreme_coordinates_do_not_overflow() {
  let viewer = ChunkCoord::new(i32::MIN, 0, 0);
  let chunk = ChunkCoord::new(i32::MAX, 0, 0);
  assert_eq!(PriorityClass::classify(viewer, chunk), PriorityClass::Far);
}
