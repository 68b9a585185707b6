//! BufferPool - bounded reuse of lattice and mesh allocations.
//!
//! Shared between the coordinator and workers as `Arc<BufferPool>`.
//! Each shelf is a mutex-protected stack; acquire pops, release pushes.
//!
//! ```text
//!   acquire_lattice(dims) ─► shelf[dims].pop() ─► zeroed lattice
//!                                 │ empty
//!                                 └─► fresh allocation (miss)
//!   release_lattice(l) ─► shelf[dims].len() < capacity ? push : drop
//! ```
//!
//! Buffers handed out behind an `Arc` come back through `release_shared_*`,
//! which only shelves them once the caller holds the last reference.
//!
//! A reacquired lattice is fully zeroed. A reacquired mesh buffer is only
//! cleared (length 0); its contents are rewritten by the mesher anyway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::{DensityLattice, LatticeDims, MeshBuffer};

/// Pool counters snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
  /// Acquires served from a shelf.
  pub hits: u64,
  /// Acquires that allocated.
  pub misses: u64,
  /// Releases dropped because the shelf was full.
  pub dropped: u64,
  /// Lattices currently on shelves.
  pub retained_lattices: usize,
  /// Mesh buffers currently on the shelf.
  pub retained_meshes: usize,
}

#[derive(Default)]
struct Counters {
  hits: AtomicU64,
  misses: AtomicU64,
  dropped: AtomicU64,
}

/// Thread-safe free lists for `DensityLattice` and `MeshBuffer`.
pub struct BufferPool {
  capacity: usize,
  lattices: Mutex<HashMap<LatticeDims, Vec<DensityLattice>>>,
  meshes: Mutex<Vec<MeshBuffer>>,
  counters: Counters,
}

impl BufferPool {
  /// Create a pool retaining at most `capacity` buffers per shelf.
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity,
      lattices: Mutex::new(HashMap::new()),
      meshes: Mutex::new(Vec::new()),
      counters: Counters::default(),
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Take a zero-filled lattice with the given dimensions.
  pub fn acquire_lattice(&self, dims: LatticeDims) -> DensityLattice {
    let reused = {
      let mut shelves = self.lattices.lock().unwrap_or_else(PoisonError::into_inner);
      shelves.get_mut(&dims).and_then(Vec::pop)
    };
    match reused {
      Some(mut lattice) => {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        lattice.reset();
        lattice
      }
      None => {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        DensityLattice::zeroed(dims)
      }
    }
  }

  /// Return a lattice. Dropped if its shelf is full.
  pub fn release_lattice(&self, lattice: DensityLattice) {
    let mut shelves = self.lattices.lock().unwrap_or_else(PoisonError::into_inner);
    let shelf = shelves.entry(lattice.dims()).or_default();
    if shelf.len() < self.capacity {
      shelf.push(lattice);
    } else {
      self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }
  }

  /// Take an empty mesh buffer with room for at least `min_vertices`.
  pub fn acquire_mesh(&self, min_vertices: usize) -> MeshBuffer {
    let reused = self
      .meshes
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .pop();
    match reused {
      Some(mut mesh) => {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        mesh.clear();
        mesh.positions.reserve(min_vertices);
        mesh.normals.reserve(min_vertices);
        mesh
      }
      None => {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        MeshBuffer::with_capacity(min_vertices)
      }
    }
  }

  /// Return a mesh buffer. Dropped if the shelf is full.
  pub fn release_mesh(&self, mesh: MeshBuffer) {
    let mut shelf = self.meshes.lock().unwrap_or_else(PoisonError::into_inner);
    if shelf.len() < self.capacity {
      shelf.push(mesh);
    } else {
      self.counters.dropped.fetch_add(1, Ordering::Relaxed);
    }
  }

  /// Shelve a shared lattice if `lattice` is its last reference.
  ///
  /// Returns `false` when other references remain; whoever drops the last
  /// one is expected to release it.
  pub fn release_shared_lattice(&self, lattice: Arc<DensityLattice>) -> bool {
    match Arc::try_unwrap(lattice) {
      Ok(lattice) => {
        self.release_lattice(lattice);
        true
      }
      Err(_) => false,
    }
  }

  /// Shelve a shared mesh buffer if `mesh` is its last reference.
  pub fn release_shared_mesh(&self, mesh: Arc<MeshBuffer>) -> bool {
    match Arc::try_unwrap(mesh) {
      Ok(mesh) => {
        self.release_mesh(mesh);
        true
      }
      Err(_) => false,
    }
  }

  pub fn stats(&self) -> PoolStats {
    let retained_lattices = self
      .lattices
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .values()
      .map(Vec::len)
      .sum();
    let retained_meshes = self.meshes.lock().unwrap_or_else(PoisonError::into_inner).len();
    PoolStats {
      hits: self.counters.hits.load(Ordering::Relaxed),
      misses: self.counters.misses.load(Ordering::Relaxed),
      dropped: self.counters.dropped.load(Ordering::Relaxed),
      retained_lattices,
      retained_meshes,
    }
  }
}

impl Default for BufferPool {
  fn default() -> Self {
    Self::new(crate::constants::DEFAULT_POOL_CAPACITY)
  }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
