use std::thread;
use std::time::Duration;

use super::*;
use crate::geometry::OriginMapping;
use crate::test_utils::{plane_lattice, CountingField, PanicField, PlaneField};
use crate::types::{Face, LatticeDims};

fn context(field: Arc<dyn DensityField>) -> WorkerContext {
  WorkerContext {
    field,
    geometry: ChunkGeometry::new(LatticeDims::cubic(4), 1.0, OriginMapping::Corner),
    settings: MeshSettings::default(),
    pool: Arc::new(BufferPool::new(8)),
  }
}

/// Poll until `expected` responses arrived (completion order preserved).
fn drain(dispatch: &mut WorkerDispatch, expected: usize) -> Vec<WorkResponse> {
  let mut responses = Vec::new();
  for _ in 0..10_000 {
    responses.extend(dispatch.poll_completions());
    if responses.len() >= expected {
      break;
    }
    thread::sleep(Duration::from_millis(1));
  }
  assert_eq!(responses.len(), expected, "timed out waiting for workers");
  responses
}

// =============================================================================
// execute
// =============================================================================

#[test]
fn test_execute_lattice() {
  let ctx = context(Arc::new(PlaneField::at(-2.0)));
  let coord = ChunkCoord::new(0, -1, 0);
  match execute(&ctx, coord, &WorkPayload::Lattice) {
    Ok(WorkOutput::Lattice(lattice)) => {
      assert_eq!(lattice.dims(), LatticeDims::cubic(4));
      // local y = 0 is world y = -4
      assert_eq!(lattice.get(0, 0, 0), -2.0);
      assert_eq!(lattice.get(0, 4, 0), 2.0);
    }
    other => panic!("unexpected output {other:?}"),
  }
}

#[test]
fn test_execute_mesh_reports_neighbor_mask() {
  let ctx = context(Arc::new(PlaneField::at(0.0)));
  let dims = LatticeDims::cubic(4);
  let side = Arc::new(plane_lattice(dims, 2.0));
  let mut neighbors = NeighborLattices::new();
  neighbors.set(Face::PosX, Some(Arc::clone(&side)));
  neighbors.set(Face::NegZ, Some(side));
  let payload = WorkPayload::Mesh {
    lattice: Arc::new(plane_lattice(dims, 2.0)),
    neighbors,
  };

  match execute(&ctx, ChunkCoord::ORIGIN, &payload) {
    Ok(WorkOutput::Mesh { mesh, neighbor_mask }) => {
      assert!(!mesh.is_empty());
      assert_eq!(
        neighbor_mask,
        (1 << Face::PosX.index()) | (1 << Face::NegZ.index())
      );
    }
    other => panic!("unexpected output {other:?}"),
  }
}

#[test]
fn test_execute_rejects_mismatched_lattice() {
  let ctx = context(Arc::new(PlaneField::at(0.0)));
  let payload = WorkPayload::Mesh {
    lattice: Arc::new(plane_lattice(LatticeDims::cubic(2), 1.0)),
    neighbors: NeighborLattices::new(),
  };
  let err = execute(&ctx, ChunkCoord::ORIGIN, &payload).unwrap_err();
  assert!(err.cause.contains("do not match"));
}

#[test]
fn test_execute_guarded_catches_panic() {
  let ctx = context(Arc::new(PanicField));
  let err = execute_guarded(&ctx, ChunkCoord::ORIGIN, &WorkPayload::Lattice).unwrap_err();
  assert!(err.cause.contains("density field exploded"), "{}", err.cause);
}

// =============================================================================
// WorkerDispatch
// =============================================================================

#[test]
fn test_dispatch_completes_all_requests() {
  let mut dispatch = WorkerDispatch::new(2, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  for x in 0..6 {
    dispatch.submit(WorkRequest::lattice(
      ChunkCoord::new(x, 0, 0),
      x as u64,
      PriorityClass::Near,
    ));
  }
  assert_eq!(dispatch.queued_len(), 6);

  assert_eq!(dispatch.pump(), 2);
  assert_eq!(dispatch.in_flight(), 2);
  assert_eq!(dispatch.queued_len(), 4);

  let responses = drain(&mut dispatch, 6);
  assert!(dispatch.is_idle());
  for response in responses {
    assert_eq!(response.kind, RequestKind::Lattice);
    assert_eq!(response.generation, response.coord.x as u64);
    assert!(matches!(response.result, Ok(WorkOutput::Lattice(_))));
  }
}

#[test]
fn test_dispatch_never_exceeds_worker_count() {
  let mut dispatch = WorkerDispatch::new(3, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  for x in 0..20 {
    dispatch.submit(WorkRequest::lattice(ChunkCoord::new(x, 0, 0), 0, PriorityClass::Far));
  }
  dispatch.pump();

  let mut seen = 0;
  for _ in 0..10_000 {
    assert!(dispatch.in_flight() <= dispatch.worker_count());
    seen += dispatch.poll_completions().len();
    if seen == 20 {
      break;
    }
    thread::sleep(Duration::from_millis(1));
  }
  assert_eq!(seen, 20);
}

#[test]
fn test_dispatch_runs_highest_priority_first() {
  let mut dispatch = WorkerDispatch::new(1, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  let far = ChunkCoord::new(8, 0, 0);
  let near = ChunkCoord::new(3, 0, 0);
  let immediate = ChunkCoord::new(1, 0, 0);
  dispatch.submit(WorkRequest::lattice(far, 0, PriorityClass::Far));
  dispatch.submit(WorkRequest::lattice(near, 0, PriorityClass::Near));
  dispatch.submit(WorkRequest::lattice(immediate, 0, PriorityClass::Immediate));
  dispatch.pump();

  let order: Vec<ChunkCoord> = drain(&mut dispatch, 3).iter().map(|r| r.coord).collect();
  assert_eq!(order, vec![immediate, near, far]);
}

#[test]
fn test_equal_priority_is_fifo() {
  let mut dispatch = WorkerDispatch::new(1, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  let handles: Vec<RequestHandle> = (0..4)
    .map(|x| {
      dispatch.submit(WorkRequest::lattice(
        ChunkCoord::new(x, 0, 0),
        0,
        PriorityClass::Medium,
      ))
    })
    .collect();
  dispatch.pump();

  let order: Vec<RequestHandle> = drain(&mut dispatch, 4).iter().map(|r| r.handle).collect();
  assert_eq!(order, handles);
}

#[test]
fn test_cancel_removes_queued_requests() {
  let field = Arc::new(CountingField::default());
  let mut dispatch = WorkerDispatch::new(1, context(field.clone())).unwrap();
  let target = ChunkCoord::new(5, 0, 0);
  dispatch.submit(WorkRequest::lattice(ChunkCoord::ORIGIN, 0, PriorityClass::Immediate));
  dispatch.submit(WorkRequest::lattice(target, 0, PriorityClass::Far));
  dispatch.submit(WorkRequest::lattice(target, 1, PriorityClass::Far));

  assert_eq!(dispatch.cancel(target), 2);
  assert_eq!(dispatch.queued_len(), 1);
  assert_eq!(dispatch.cancel(target), 0);

  dispatch.pump();
  let responses = drain(&mut dispatch, 1);
  assert_eq!(responses[0].coord, ChunkCoord::ORIGIN);
  assert_eq!(field.count(), LatticeDims::cubic(4).sample_count());
}

#[test]
fn test_cancel_shelves_payload_lattices() {
  let mut dispatch = WorkerDispatch::new(1, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  let dims = LatticeDims::cubic(4);
  let shared = Arc::new(plane_lattice(dims, 1.0));
  let mut neighbors = NeighborLattices::new();
  neighbors.set(Face::PosY, Some(Arc::new(plane_lattice(dims, 1.0))));
  neighbors.set(Face::NegY, Some(Arc::clone(&shared)));
  let target = ChunkCoord::new(2, 0, 0);
  dispatch.submit(WorkRequest::mesh(
    target,
    3,
    PriorityClass::Near,
    Arc::new(plane_lattice(dims, 1.0)),
    neighbors,
  ));

  assert_eq!(dispatch.cancel(target), 1);
  // the lattice still shared with the caller stays with the caller
  assert_eq!(dispatch.context().pool.stats().retained_lattices, 2);
  assert_eq!(Arc::strong_count(&shared), 1);
}

#[test]
fn test_response_hands_back_payload() {
  let mut dispatch = WorkerDispatch::new(2, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  let dims = LatticeDims::cubic(4);
  let lattice = Arc::new(plane_lattice(dims, 2.0));
  let neighbor = Arc::new(plane_lattice(dims, 2.0));
  let mut neighbors = NeighborLattices::new();
  neighbors.set(Face::PosX, Some(Arc::clone(&neighbor)));
  dispatch.submit(WorkRequest::mesh(
    ChunkCoord::ORIGIN,
    1,
    PriorityClass::Immediate,
    Arc::clone(&lattice),
    neighbors,
  ));
  dispatch.submit(WorkRequest::lattice(ChunkCoord::new(1, 0, 0), 2, PriorityClass::Adjacent));
  dispatch.pump();

  let mut responses = drain(&mut dispatch, 2);
  responses.sort_by_key(|r| r.generation);
  assert!(matches!(responses[1].payload, WorkPayload::Lattice));
  let mesh = responses.remove(0);
  assert!(mesh.result.is_ok());
  assert!(matches!(mesh.payload, WorkPayload::Mesh { .. }));
  // workers keep no reference once the response is out
  assert_eq!(Arc::strong_count(&lattice), 2);
  assert_eq!(Arc::strong_count(&neighbor), 2);

  drop((lattice, neighbor));
  let pool = Arc::clone(&dispatch.context().pool);
  let before = pool.stats().retained_lattices;
  assert_eq!(mesh.payload.release_into(&pool), 2);
  assert_eq!(pool.stats().retained_lattices, before + 2);
}

#[test]
fn test_worker_panic_becomes_failure() {
  let mut dispatch = WorkerDispatch::new(2, context(Arc::new(PanicField))).unwrap();
  dispatch.submit(WorkRequest::lattice(ChunkCoord::ORIGIN, 7, PriorityClass::Immediate));
  dispatch.submit(WorkRequest::lattice(ChunkCoord::new(1, 0, 0), 8, PriorityClass::Adjacent));
  dispatch.pump();

  let responses = drain(&mut dispatch, 2);
  for response in &responses {
    assert!(response.result.is_err());
  }
  // pool threads survive the panic
  dispatch.submit(WorkRequest::lattice(ChunkCoord::ORIGIN, 9, PriorityClass::Immediate));
  dispatch.pump();
  let again = drain(&mut dispatch, 1);
  assert_eq!(again[0].generation, 9);
}

#[test]
fn test_zero_workers_clamped_to_one() {
  let dispatch = WorkerDispatch::new(0, context(Arc::new(PlaneField::at(0.0)))).unwrap();
  assert_eq!(dispatch.worker_count(), 1);
}
