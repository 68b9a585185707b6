//! TerrainEngine - the coordinating context.
//!
//! Owns the chunk store, the scheduler and the worker dispatch, and is the
//! only writer of chunk lifecycle state. The host calls `tick` at its own
//! rate with the viewer position; the engine never blocks on workers.
//!
//! # Tick
//!
//! ```text
//!   1. poll completions ──► ChunkStore (stale results back to the pool)
//!   2. scheduler.update(viewer) ──► admit ≤ K lattice requests
//!   3. touch in-range records
//!   4. select evictions ──► cancel queued work, evict, untrack
//!   5. plan meshes ──► mesh requests with current neighbor lattices
//!   6. pump dispatch
//! ```

use std::sync::Arc;

use glam::DVec3;
use tracing::{debug, trace, warn};
use web_time::Instant;

use crate::config::TerrainConfig;
use crate::density::{DensityField, LayeredDensity};
use crate::dispatch::{
  WorkOutput, WorkRequest, WorkResponse, WorkerContext, WorkerDispatch,
};
use crate::error::TerrainError;
use crate::geometry::ChunkGeometry;
use crate::mesher::{MeshSettings, NeighborLattices};
use crate::metrics::StreamingMetrics;
use crate::pool::{BufferPool, PoolStats};
use crate::scheduler::{ChunkPhase, StreamingScheduler};
use crate::store::{ApplyOutcome, ChunkStore, LifecycleState};
use crate::types::{ChunkCoord, Face, MeshBuffer};

/// Output of one tick for the renderer.
#[derive(Debug, Default)]
pub struct TerrainUpdate {
  /// Chunks that reached MeshReady (again, for re-meshes) this tick.
  ///
  /// Meshes the renderer later replaces or drops should go back through
  /// `TerrainEngine::recycle_mesh`.
  pub ready: Vec<(ChunkCoord, Arc<MeshBuffer>)>,
  /// Chunks whose record was removed this tick.
  pub evicted: Vec<ChunkCoord>,
}

impl TerrainUpdate {
  pub fn is_empty(&self) -> bool {
    self.ready.is_empty() && self.evicted.is_empty()
  }
}

pub struct TerrainEngine {
  config: TerrainConfig,
  geometry: ChunkGeometry,
  pool: Arc<BufferPool>,
  store: ChunkStore,
  scheduler: StreamingScheduler,
  dispatch: WorkerDispatch,
  metrics: StreamingMetrics,
}

impl TerrainEngine {
  /// Validate `config` and build the layered noise field it describes.
  pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
    config.validate()?;
    let field = LayeredDensity::new(&config.noise, config.seed)?;
    Self::with_field(config, Arc::new(field))
  }

  /// Validate `config` and use `field` instead of the configured noise.
  pub fn with_field(
    config: TerrainConfig,
    field: Arc<dyn DensityField>,
  ) -> Result<Self, TerrainError> {
    config.validate()?;
    let geometry = config.geometry();
    let pool = Arc::new(BufferPool::new(config.pool_capacity));
    let dispatch = WorkerDispatch::new(
      config.worker_count,
      WorkerContext {
        field,
        geometry,
        settings: MeshSettings::from_config(&config),
        pool: Arc::clone(&pool),
      },
    )?;
    debug!(
      dims = ?geometry.dims,
      workers = dispatch.worker_count(),
      horizontal_radius = config.horizontal_radius,
      vertical_radius = config.vertical_radius,
      "terrain engine started"
    );
    Ok(Self {
      store: ChunkStore::new(Arc::clone(&pool)),
      scheduler: StreamingScheduler::from_config(&config),
      config,
      geometry,
      pool,
      dispatch,
      metrics: StreamingMetrics::new(),
    })
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn config(&self) -> &TerrainConfig {
    &self.config
  }

  pub fn geometry(&self) -> &ChunkGeometry {
    &self.geometry
  }

  pub fn store(&self) -> &ChunkStore {
    &self.store
  }

  pub fn scheduler(&self) -> &StreamingScheduler {
    &self.scheduler
  }

  pub fn metrics(&self) -> &StreamingMetrics {
    &self.metrics
  }

  pub fn pool_stats(&self) -> PoolStats {
    self.pool.stats()
  }

  /// Current mesh of `coord`, if it is MeshReady.
  pub fn mesh(&self, coord: ChunkCoord) -> Option<Arc<MeshBuffer>> {
    self
      .store
      .get(coord)
      .filter(|r| r.state == LifecycleState::MeshReady)
      .and_then(|r| r.mesh.clone())
  }

  /// Hand back a mesh received through `TerrainUpdate` once the renderer
  /// has replaced or dropped it.
  ///
  /// The buffer is shelved for reuse when this is its last reference.
  /// Returns `false` if the store (or another holder) still shares it.
  pub fn recycle_mesh(&self, mesh: Arc<MeshBuffer>) -> bool {
    self.pool.release_shared_mesh(mesh)
  }

  /// Requests queued or running on workers.
  pub fn pending_work(&self) -> usize {
    self.dispatch.queued_len() + self.dispatch.in_flight()
  }

  /// No outstanding work: every tracked chunk is generated and meshed.
  pub fn is_settled(&self) -> bool {
    self.dispatch.is_idle()
      && self.scheduler.count_in(ChunkPhase::Pending) == 0
      && self.scheduler.count_in(ChunkPhase::Generating) == 0
      && self.store.iter().all(|r| r.state == LifecycleState::MeshReady)
  }

  // ===========================================================================
  // Tick
  // ===========================================================================

  /// Advance streaming for a viewer at world position `viewer`.
  #[cfg_attr(feature = "spans", tracing::instrument(skip_all, name = "terrain.tick"))]
  pub fn tick(&mut self, viewer: DVec3, now: Instant) -> TerrainUpdate {
    let mut update = TerrainUpdate::default();

    for response in self.dispatch.poll_completions() {
      self.apply_response(response, &mut update);
    }

    let viewer_chunk = self.geometry.chunk_at(viewer);
    let plan = self.scheduler.update(viewer_chunk);
    for coord in plan.dropped {
      // only invalidated chunks have a record while Pending
      self.dispatch.cancel(coord);
      if self.store.evict(coord).is_some() {
        self.metrics.record_eviction();
        update.evicted.push(coord);
      }
    }
    for (coord, priority) in plan.admitted {
      let generation = self.store.get_or_create(coord, now).generation;
      self
        .dispatch
        .submit(WorkRequest::lattice(coord, generation, priority));
    }

    let live: Vec<ChunkCoord> = self.scheduler.live_in_range().collect();
    for coord in live {
      self.store.touch(coord, now);
    }

    for coord in self.scheduler.select_evictions(&self.store, now) {
      self.dispatch.cancel(coord);
      self.scheduler.forget(coord);
      if self.store.evict(coord).is_some() {
        debug!(chunk = %coord, "chunk evicted");
        self.metrics.record_eviction();
        update.evicted.push(coord);
      }
    }

    for plan in self.scheduler.plan_meshes(&self.store) {
      let Some(lattice) = self.store.lattice(plan.coord).cloned() else {
        self.scheduler.mesh_finished(plan.coord, plan.generation);
        continue;
      };
      let mut neighbors = NeighborLattices::new();
      for face in Face::ALL {
        neighbors.set(face, self.store.lattice(plan.coord.neighbor(face)).cloned());
      }
      self.dispatch.submit(WorkRequest::mesh(
        plan.coord,
        plan.generation,
        plan.priority,
        lattice,
        neighbors,
      ));
    }

    self.dispatch.pump();
    self.metrics.record_pool(self.pool.stats());
    update
  }

  /// Discard the lattice and mesh of `coord` and regenerate it. Face
  /// neighbors are re-meshed once the new lattice lands.
  ///
  /// Returns false if the chunk is not loaded.
  pub fn invalidate(&mut self, coord: ChunkCoord) -> bool {
    if self.store.invalidate(coord).is_none() {
      return false;
    }
    self.dispatch.cancel(coord);
    if !self.scheduler.requeue(coord) {
      self.store.evict(coord);
      return false;
    }
    debug!(chunk = %coord, "chunk invalidated");
    true
  }

  // ===========================================================================
  // Completions
  // ===========================================================================

  fn apply_response(&mut self, response: WorkResponse, update: &mut TerrainUpdate) {
    let WorkResponse {
      coord,
      kind,
      generation,
      timing_us,
      result,
      payload,
      ..
    } = response;
    // before applying, so an eviction below finds the store as sole owner
    payload.release_into(&self.pool);

    match result {
      Ok(WorkOutput::Lattice(lattice)) => {
        match self.store.apply_lattice_result(coord, generation, lattice) {
          ApplyOutcome::Applied => {
            self.metrics.record_lattice(timing_us);
            self.scheduler.lattice_ready(coord);
          }
          ApplyOutcome::Stale => {
            trace!(chunk = %coord, generation, "stale lattice discarded");
            self.metrics.record_stale();
          }
        }
      }
      Ok(WorkOutput::Mesh {
        mesh,
        neighbor_mask,
      }) => {
        self.scheduler.mesh_finished(coord, generation);
        let triangles = mesh.triangle_count();
        match self
          .store
          .apply_mesh_result(coord, generation, mesh, neighbor_mask)
        {
          ApplyOutcome::Applied => {
            self.metrics.record_mesh(timing_us, triangles);
            if let Some(mesh) = self.mesh(coord) {
              update.ready.push((coord, mesh));
            }
          }
          ApplyOutcome::Stale => {
            trace!(chunk = %coord, generation, "stale mesh discarded");
            self.metrics.record_stale();
          }
        }
      }
      Err(failure) => {
        self.scheduler.mesh_finished(coord, generation);
        let current = self
          .store
          .get(coord)
          .is_some_and(|r| r.generation == generation);
        if !current {
          trace!(chunk = %coord, ?kind, "stale failure ignored");
          self.metrics.record_stale();
          return;
        }
        warn!(chunk = %coord, ?kind, %failure, "chunk generation failed, will retry");
        self.metrics.record_failure();
        let had_mesh = self.store.get(coord).is_some_and(|r| r.mesh.is_some());
        self.store.evict(coord);
        self.scheduler.forget(coord);
        if had_mesh {
          update.evicted.push(coord);
        }
      }
    }
  }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
