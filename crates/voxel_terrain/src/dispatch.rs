//! Worker dispatch - background density and mesh computation.
//!
//! A fixed rayon pool with `worker_count` threads runs one request per
//! thread. Requests beyond that wait in a coordinator-side priority queue
//! (scheduler priority class, then submission order); nothing is dropped.
//!
//! ```text
//!   submit ──► BinaryHeap ──pump──► rayon::spawn ──► execute ──► crossbeam tx
//!                  ▲                  (≤ worker_count running)        │
//!                  │ cancel(coord)                                     ▼
//!               removes queued                         poll_completions (rx)
//! ```
//!
//! Workers touch only their request payload, the shared read-only
//! `WorkerContext` and the `BufferPool`. Panics are caught at the worker
//! boundary and reported as `GenerationFailure`.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;
use web_time::Instant;

use crate::density::{fill_lattice, DensityField};
use crate::error::{GenerationFailure, TerrainError};
use crate::geometry::ChunkGeometry;
use crate::mesher::{extract_pooled, MeshSettings, NeighborLattices};
use crate::pool::BufferPool;
use crate::scheduler::PriorityClass;
use crate::types::{ChunkCoord, DensityLattice, MeshBuffer};

// =============================================================================
// Message types
// =============================================================================

/// Which computation a request asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
  Lattice,
  Mesh,
}

/// Request payload. Mesh requests carry the lattice and the neighbor
/// lattices available at submission time.
#[derive(Clone, Debug)]
pub enum WorkPayload {
  Lattice,
  Mesh {
    lattice: Arc<DensityLattice>,
    neighbors: NeighborLattices,
  },
}

impl WorkPayload {
  pub fn kind(&self) -> RequestKind {
    match self {
      WorkPayload::Lattice => RequestKind::Lattice,
      WorkPayload::Mesh { .. } => RequestKind::Mesh,
    }
  }

  /// Drop the payload, shelving every lattice this was the last holder of.
  /// Returns how many were shelved.
  pub fn release_into(self, pool: &BufferPool) -> usize {
    match self {
      WorkPayload::Lattice => 0,
      WorkPayload::Mesh { lattice, neighbors } => std::iter::once(lattice)
        .chain(neighbors.into_lattices())
        .map(|lattice| pool.release_shared_lattice(lattice))
        .filter(|&shelved| shelved)
        .count(),
    }
  }
}

/// One unit of background work.
#[derive(Clone, Debug)]
pub struct WorkRequest {
  pub coord: ChunkCoord,
  /// Store generation this request was issued for.
  pub generation: u64,
  pub priority: PriorityClass,
  pub payload: WorkPayload,
}

impl WorkRequest {
  pub fn lattice(coord: ChunkCoord, generation: u64, priority: PriorityClass) -> Self {
    Self {
      coord,
      generation,
      priority,
      payload: WorkPayload::Lattice,
    }
  }

  pub fn mesh(
    coord: ChunkCoord,
    generation: u64,
    priority: PriorityClass,
    lattice: Arc<DensityLattice>,
    neighbors: NeighborLattices,
  ) -> Self {
    Self {
      coord,
      generation,
      priority,
      payload: WorkPayload::Mesh { lattice, neighbors },
    }
  }

  pub fn kind(&self) -> RequestKind {
    self.payload.kind()
  }
}

/// Produced buffer, ownership handed back to the coordinator.
#[derive(Debug)]
pub enum WorkOutput {
  Lattice(DensityLattice),
  Mesh {
    mesh: MeshBuffer,
    /// Faces whose neighbor lattice was used.
    neighbor_mask: u8,
  },
}

/// Completion message.
#[derive(Debug)]
pub struct WorkResponse {
  pub handle: RequestHandle,
  pub coord: ChunkCoord,
  pub kind: RequestKind,
  pub generation: u64,
  /// Wall time spent in the worker, in microseconds.
  pub timing_us: u64,
  pub result: Result<WorkOutput, GenerationFailure>,
  /// The request payload, handed back so the coordinator drops the last
  /// references to its lattices rather than a worker thread.
  pub payload: WorkPayload,
}

/// Identifier returned by `submit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestHandle(u64);

impl RequestHandle {
  pub fn raw(&self) -> u64 {
    self.0
  }
}

// =============================================================================
// Worker context
// =============================================================================

/// Read-only state shared by all workers.
pub struct WorkerContext {
  pub field: Arc<dyn DensityField>,
  pub geometry: ChunkGeometry,
  pub settings: MeshSettings,
  pub pool: Arc<BufferPool>,
}

/// Run one request synchronously.
pub fn execute(
  context: &WorkerContext,
  coord: ChunkCoord,
  payload: &WorkPayload,
) -> Result<WorkOutput, GenerationFailure> {
  if !context.geometry.dims.is_valid() {
    return Err(GenerationFailure::new(format!(
      "invalid lattice dimensions {:?}",
      context.geometry.dims
    )));
  }
  match payload {
    WorkPayload::Lattice => Ok(WorkOutput::Lattice(fill_lattice(
      &*context.field,
      coord,
      &context.geometry,
      &context.pool,
    ))),
    WorkPayload::Mesh { lattice, neighbors } => {
      if lattice.dims() != context.geometry.dims {
        return Err(GenerationFailure::new(format!(
          "lattice dimensions {:?} do not match chunk dimensions {:?}",
          lattice.dims(),
          context.geometry.dims
        )));
      }
      let mut mesh = context.pool.acquire_mesh(0);
      extract_pooled(
        lattice,
        &neighbors.as_set(),
        &context.settings,
        context.geometry.world_origin(coord),
        &context.pool,
        &mut mesh,
      );
      Ok(WorkOutput::Mesh {
        mesh,
        neighbor_mask: neighbors.present_mask(),
      })
    }
  }
}

/// `execute` with panics downgraded to `GenerationFailure`.
pub fn execute_guarded(
  context: &WorkerContext,
  coord: ChunkCoord,
  payload: &WorkPayload,
) -> Result<WorkOutput, GenerationFailure> {
  panic::catch_unwind(AssertUnwindSafe(|| execute(context, coord, payload)))
    .unwrap_or_else(|panic| Err(GenerationFailure::new(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(msg) = panic.downcast_ref::<&str>() {
    format!("worker panicked: {msg}")
  } else if let Some(msg) = panic.downcast_ref::<String>() {
    format!("worker panicked: {msg}")
  } else {
    "worker panicked".to_string()
  }
}

// =============================================================================
// Dispatch queue
// =============================================================================

struct Queued {
  handle: RequestHandle,
  request: WorkRequest,
}

impl Queued {
  #[inline]
  fn key(&self) -> (PriorityClass, RequestHandle) {
    (self.request.priority, self.handle)
  }
}

impl PartialEq for Queued {
  fn eq(&self, other: &Self) -> bool {
    self.key() == other.key()
  }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Queued {
  // BinaryHeap pops the greatest: invert so the lowest class, then the
  // oldest handle, comes out first.
  fn cmp(&self, other: &Self) -> Ordering {
    other.key().cmp(&self.key())
  }
}

/// Fixed worker pool with a priority queue in front of it.
pub struct WorkerDispatch {
  threads: rayon::ThreadPool,
  worker_count: usize,
  context: Arc<WorkerContext>,
  queue: BinaryHeap<Queued>,
  running: usize,
  next_handle: u64,
  tx: Sender<WorkResponse>,
  rx: Receiver<WorkResponse>,
}

impl WorkerDispatch {
  pub fn new(worker_count: usize, context: WorkerContext) -> Result<Self, TerrainError> {
    let worker_count = worker_count.max(1);
    let threads = rayon::ThreadPoolBuilder::new()
      .num_threads(worker_count)
      .thread_name(|i| format!("terrain-worker-{i}"))
      .build()?;
    let (tx, rx) = crossbeam_channel::unbounded();
    Ok(Self {
      threads,
      worker_count,
      context: Arc::new(context),
      queue: BinaryHeap::new(),
      running: 0,
      next_handle: 0,
      tx,
      rx,
    })
  }

  pub fn context(&self) -> &WorkerContext {
    &self.context
  }

  pub fn worker_count(&self) -> usize {
    self.worker_count
  }

  /// Requests waiting for a worker.
  pub fn queued_len(&self) -> usize {
    self.queue.len()
  }

  /// Requests running or finished but not yet polled.
  pub fn in_flight(&self) -> usize {
    self.running
  }

  pub fn is_idle(&self) -> bool {
    self.queue.is_empty() && self.running == 0
  }

  /// Queue a request. Call `pump` to start work.
  pub fn submit(&mut self, request: WorkRequest) -> RequestHandle {
    let handle = RequestHandle(self.next_handle);
    self.next_handle += 1;
    self.queue.push(Queued { handle, request });
    handle
  }

  /// Remove queued (not yet running) requests for `coord`. Running requests
  /// finish and are discarded by the store's generation check.
  ///
  /// Lattices held only by a cancelled payload go back to the pool.
  pub fn cancel(&mut self, coord: ChunkCoord) -> usize {
    let (cancelled, kept): (Vec<Queued>, Vec<Queued>) = std::mem::take(&mut self.queue)
      .into_iter()
      .partition(|q| q.request.coord == coord);
    self.queue = kept.into_iter().collect();
    let count = cancelled.len();
    for queued in cancelled {
      queued.request.payload.release_into(&self.context.pool);
    }
    if count > 0 {
      trace!(coord = %coord, count, "cancelled queued requests");
    }
    count
  }

  /// Start queued requests while workers are free. Returns how many started.
  pub fn pump(&mut self) -> usize {
    let mut started = 0;
    while self.running < self.worker_count {
      let Some(Queued { handle, request }) = self.queue.pop() else {
        break;
      };
      let context = Arc::clone(&self.context);
      let tx = self.tx.clone();
      self.threads.spawn(move || {
        let start = Instant::now();
        let result = execute_guarded(&context, request.coord, &request.payload);
        let response = WorkResponse {
          handle,
          coord: request.coord,
          kind: request.kind(),
          generation: request.generation,
          timing_us: start.elapsed().as_micros() as u64,
          result,
          payload: request.payload,
        };
        // receiver gone means the dispatcher was dropped
        let _ = tx.send(response);
      });
      self.running += 1;
      started += 1;
    }
    started
  }

  /// Collect finished responses without blocking, then refill free workers.
  pub fn poll_completions(&mut self) -> Vec<WorkResponse> {
    let responses: Vec<WorkResponse> = self.rx.try_iter().collect();
    self.running = self.running.saturating_sub(responses.len());
    self.pump();
    responses
  }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
