//! ChunkStore - the single owner of chunk records.
//!
//! Every lifecycle transition goes through a store operation. Worker
//! results carry the generation token of the record they were requested
//! for; a result whose token no longer matches (the chunk was evicted,
//! re-created or invalidated meanwhile) is stale and its buffers go back
//! to the pool instead of into the map.
//!
//! ```text
//!   get_or_create ──► Requested ──apply_lattice──► LatticeReady
//!                         ▲                             │ apply_mesh
//!                         │ invalidate                  ▼
//!                         └──────────────────────── MeshReady ◄─┐
//!                                                       │       │ re-mesh
//!                                                       └───────┘
//!   evict / discard ──► Evicted (record removed, buffers released)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use web_time::Instant;

use crate::pool::BufferPool;
use crate::types::{ChunkCoord, DensityLattice, MeshBuffer};

/// Lifecycle state of a chunk record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
  /// Lattice requested, not yet produced.
  Requested,
  /// Lattice present, no mesh yet.
  LatticeReady,
  /// Lattice and mesh present.
  MeshReady,
  /// Removed from the store. Only seen on records returned by `evict`.
  Evicted,
}

impl LifecycleState {
  /// True once a lattice is available for meshing or as a neighbor.
  #[inline]
  pub fn has_lattice(self) -> bool {
    matches!(self, LifecycleState::LatticeReady | LifecycleState::MeshReady)
  }
}

/// Result of applying a worker completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
  Applied,
  /// The record is gone, or its generation moved on. Buffers were released.
  Stale,
}

/// Terrain data for one chunk coordinate.
#[derive(Debug)]
pub struct ChunkRecord {
  pub coord: ChunkCoord,
  pub state: LifecycleState,
  /// Token matched against worker completions.
  pub generation: u64,
  pub lattice: Option<Arc<DensityLattice>>,
  pub mesh: Option<Arc<MeshBuffer>>,
  /// Faces whose neighbor lattice was present when `mesh` was built.
  pub mesh_neighbors: u8,
  pub last_access: Instant,
}

/// Keyed map from chunk coordinate to record.
pub struct ChunkStore {
  records: HashMap<ChunkCoord, ChunkRecord>,
  pool: Arc<BufferPool>,
  next_generation: u64,
}

impl ChunkStore {
  pub fn new(pool: Arc<BufferPool>) -> Self {
    Self {
      records: HashMap::new(),
      pool,
      next_generation: 1,
    }
  }

  /// Return the record for `coord`, creating a `Requested` one if absent.
  /// Refreshes `last_access` either way.
  pub fn get_or_create(&mut self, coord: ChunkCoord, now: Instant) -> &ChunkRecord {
    let next_generation = &mut self.next_generation;
    let record = self.records.entry(coord).or_insert_with(|| {
      let generation = *next_generation;
      *next_generation += 1;
      ChunkRecord {
        coord,
        state: LifecycleState::Requested,
        generation,
        lattice: None,
        mesh: None,
        mesh_neighbors: 0,
        last_access: now,
      }
    });
    record.last_access = now;
    record
  }

  pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
    self.records.get(&coord)
  }

  pub fn contains(&self, coord: ChunkCoord) -> bool {
    self.records.contains_key(&coord)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ChunkRecord> {
    self.records.values()
  }

  /// Lattice of `coord` if it is ready.
  pub fn lattice(&self, coord: ChunkCoord) -> Option<&Arc<DensityLattice>> {
    self
      .records
      .get(&coord)
      .filter(|r| r.state.has_lattice())
      .and_then(|r| r.lattice.as_ref())
  }

  /// Store a produced lattice if `generation` still matches a `Requested`
  /// record.
  pub fn apply_lattice_result(
    &mut self,
    coord: ChunkCoord,
    generation: u64,
    lattice: DensityLattice,
  ) -> ApplyOutcome {
    match self.records.get_mut(&coord) {
      Some(record)
        if record.generation == generation && record.state == LifecycleState::Requested =>
      {
        record.lattice = Some(Arc::new(lattice));
        record.state = LifecycleState::LatticeReady;
        ApplyOutcome::Applied
      }
      _ => {
        self.pool.release_lattice(lattice);
        ApplyOutcome::Stale
      }
    }
  }

  /// Store a produced mesh, replacing any previous one.
  ///
  /// `neighbor_mask` records which faces had neighbor lattices at build time.
  pub fn apply_mesh_result(
    &mut self,
    coord: ChunkCoord,
    generation: u64,
    mesh: MeshBuffer,
    neighbor_mask: u8,
  ) -> ApplyOutcome {
    match self.records.get_mut(&coord) {
      Some(record) if record.generation == generation && record.state.has_lattice() => {
        let previous = record.mesh.replace(Arc::new(mesh));
        record.mesh_neighbors = neighbor_mask;
        record.state = LifecycleState::MeshReady;
        if let Some(previous) = previous {
          self.pool.release_shared_mesh(previous);
        }
        ApplyOutcome::Applied
      }
      _ => {
        self.pool.release_mesh(mesh);
        ApplyOutcome::Stale
      }
    }
  }

  /// Remove a record and return its buffers to the pool.
  ///
  /// Buffers still shared (a renderer or in-flight mesh request holds an
  /// `Arc`) are shelved by their last owner through the pool's
  /// `release_shared_*` methods instead.
  pub fn evict(&mut self, coord: ChunkCoord) -> Option<ChunkRecord> {
    let mut record = self.records.remove(&coord)?;
    take_buffers(&self.pool, &mut record);
    record.state = LifecycleState::Evicted;
    Some(record)
  }

  /// Drop a record's lattice and mesh and restart it at `Requested` with a
  /// fresh generation. In-flight results for the old generation become stale.
  pub fn invalidate(&mut self, coord: ChunkCoord) -> Option<u64> {
    let record = self.records.get_mut(&coord)?;
    take_buffers(&self.pool, record);
    record.state = LifecycleState::Requested;
    record.generation = self.next_generation;
    self.next_generation += 1;
    Some(record.generation)
  }

  /// Refresh `last_access` of an existing record.
  pub fn touch(&mut self, coord: ChunkCoord, now: Instant) -> bool {
    match self.records.get_mut(&coord) {
      Some(record) => {
        record.last_access = now;
        true
      }
      None => false,
    }
  }
}

/// Drop the record's buffers, shelving any not shared with a renderer or an
/// in-flight request. Those holders release their copies themselves.
fn take_buffers(pool: &BufferPool, record: &mut ChunkRecord) {
  if let Some(lattice) = record.lattice.take() {
    pool.release_shared_lattice(lattice);
  }
  if let Some(mesh) = record.mesh.take() {
    pool.release_shared_mesh(mesh);
  }
  record.mesh_neighbors = 0;
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
