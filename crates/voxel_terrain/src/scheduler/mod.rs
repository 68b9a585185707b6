//! Streaming scheduler - which chunks should exist, and in what order.
//!
//! Holds coordinates, phases and priorities only. Chunk contents live in
//! `ChunkStore`; the scheduler reads the store to decide on meshing and
//! eviction but never mutates it.
//!
//! # Per-chunk phases
//!
//! ```text
//!   NotTracked ──in range──► Pending ──budget──► Generating ──lattice──► Ready
//!        ▲                     │                                          │
//!        │    out of range ◄───┘                          eviction rule   │
//!        └──────────────── forget ◄──────── Stale ◄───────────────────────┘
//! ```
//!
//! # Candidate set
//!
//! Box of `horizontal_radius` on X/Z and `vertical_radius` on Y around the
//! viewer chunk, sorted by `PriorityClass` then Manhattan distance. At most
//! `TickBudget::max_generations` Pending chunks are admitted per tick.
//!
//! # Meshing
//!
//! A Ready chunk is meshed once every in-range face neighbor has a lattice,
//! or immediately if it is `Immediate`. A chunk meshed without some
//! neighbor is re-meshed when that neighbor's lattice shows up.

mod budget;
mod priority;

pub use budget::{EvictionPolicy, TickBudget};
pub use priority::PriorityClass;

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{debug, trace};
use web_time::Instant;

use crate::config::TerrainConfig;
use crate::store::{ChunkStore, LifecycleState};
use crate::types::{ChunkCoord, Face};

/// Scheduler phase of a tracked chunk. Untracked chunks have no phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkPhase {
  /// In range, waiting for generation budget.
  Pending,
  /// Lattice requested from a worker.
  Generating,
  /// Lattice produced; meshing follows.
  Ready,
  /// Selected for eviction this tick.
  Stale,
}

#[derive(Clone, Copy, Debug)]
struct Tracked {
  phase: ChunkPhase,
  priority: PriorityClass,
  /// Generation of the mesh request in flight, if any.
  mesh_in_flight: Option<u64>,
  /// Re-mesh requested regardless of neighbor changes.
  remesh: bool,
  /// Lattice being regenerated after invalidation.
  invalidated: bool,
}

/// Outcome of a scheduling update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickPlan {
  /// Chunks moved Pending → Generating this tick, in priority order.
  pub admitted: SmallVec<[(ChunkCoord, PriorityClass); 8]>,
  /// Pending chunks that left the candidate set and are no longer tracked.
  pub dropped: Vec<ChunkCoord>,
}

/// Mesh request chosen by `plan_meshes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshPlan {
  pub coord: ChunkCoord,
  pub priority: PriorityClass,
  /// Record generation the mesh is built for.
  pub generation: u64,
}

pub struct StreamingScheduler {
  horizontal_radius: u32,
  vertical_radius: u32,
  budget: TickBudget,
  eviction: EvictionPolicy,
  viewer: Option<ChunkCoord>,
  candidates: Vec<(ChunkCoord, PriorityClass)>,
  tracked: HashMap<ChunkCoord, Tracked>,
}

impl StreamingScheduler {
  pub fn new(
    horizontal_radius: u32,
    vertical_radius: u32,
    budget: TickBudget,
    eviction: EvictionPolicy,
  ) -> Self {
    Self {
      horizontal_radius,
      vertical_radius,
      budget,
      eviction,
      viewer: None,
      candidates: Vec::new(),
      tracked: HashMap::new(),
    }
  }

  pub fn from_config(config: &TerrainConfig) -> Self {
    Self::new(
      config.horizontal_radius,
      config.vertical_radius,
      TickBudget::from_config(config),
      EvictionPolicy::from_config(config),
    )
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  pub fn viewer(&self) -> Option<ChunkCoord> {
    self.viewer
  }

  pub fn budget(&self) -> TickBudget {
    self.budget
  }

  /// Current candidate set, sorted by priority.
  pub fn candidates(&self) -> &[(ChunkCoord, PriorityClass)] {
    &self.candidates
  }

  /// Largest Manhattan distance inside the candidate box.
  ///
  /// Only box corners reach it, so a chunk straight along one axis is kept up
  /// to `tracked_radius() + hysteresis` chunks away, well past the radius it
  /// was admitted at. Saturates for radii that `TerrainConfig::validate`
  /// would reject.
  pub fn tracked_radius(&self) -> u32 {
    self
      .horizontal_radius
      .saturating_mul(2)
      .saturating_add(self.vertical_radius)
  }

  /// True if `coord` lies inside the candidate box around the viewer.
  pub fn in_range(&self, coord: ChunkCoord) -> bool {
    match self.viewer {
      Some(viewer) => within_box(viewer, coord, self.horizontal_radius, self.vertical_radius),
      None => false,
    }
  }

  /// Phase of `coord`; `None` means not tracked.
  pub fn phase(&self, coord: ChunkCoord) -> Option<ChunkPhase> {
    self.tracked.get(&coord).map(|t| t.phase)
  }

  pub fn priority(&self, coord: ChunkCoord) -> Option<PriorityClass> {
    self.tracked.get(&coord).map(|t| t.priority)
  }

  pub fn tracked_len(&self) -> usize {
    self.tracked.len()
  }

  pub fn count_in(&self, phase: ChunkPhase) -> usize {
    self.tracked.values().filter(|t| t.phase == phase).count()
  }

  pub fn is_mesh_in_flight(&self, coord: ChunkCoord) -> bool {
    self
      .tracked
      .get(&coord)
      .is_some_and(|t| t.mesh_in_flight.is_some())
  }

  // ===========================================================================
  // Candidate set and admission
  // ===========================================================================

  /// Candidate box around `viewer`, sorted by class, distance, coordinate.
  pub fn candidate_set(
    viewer: ChunkCoord,
    horizontal_radius: u32,
    vertical_radius: u32,
  ) -> Vec<(ChunkCoord, PriorityClass)> {
    let h = horizontal_radius.min(i32::MAX as u32) as i32;
    let v = vertical_radius.min(i32::MAX as u32) as i32;
    let side = 2 * h as usize + 1;
    let mut out = Vec::with_capacity(side * side * (2 * v as usize + 1));
    for dy in -v..=v {
      for dz in -h..=h {
        for dx in -h..=h {
          let coord = viewer.offset(dx, dy, dz);
          out.push((coord, PriorityClass::from_offset(dx, dy, dz)));
        }
      }
    }
    out.sort_by_key(|&(coord, class)| (class, viewer.manhattan_distance(coord), coord));
    out
  }

  /// Recompute the candidate set for `viewer`, track new candidates as
  /// Pending, untrack Pending chunks that left range and admit up to the
  /// generation budget.
  pub fn update(&mut self, viewer: ChunkCoord) -> TickPlan {
    if self.viewer != Some(viewer) {
      self.viewer = Some(viewer);
      self.candidates =
        Self::candidate_set(viewer, self.horizontal_radius, self.vertical_radius);
    }

    let mut plan = TickPlan::default();

    for &(coord, priority) in &self.candidates {
      let tracked = self.tracked.entry(coord).or_insert(Tracked {
        phase: ChunkPhase::Pending,
        priority,
        mesh_in_flight: None,
        remesh: false,
        invalidated: false,
      });
      tracked.priority = priority;
    }

    let (h, v) = (self.horizontal_radius, self.vertical_radius);
    self.tracked.retain(|&coord, tracked| {
      let keep = tracked.phase != ChunkPhase::Pending || within_box(viewer, coord, h, v);
      if !keep {
        plan.dropped.push(coord);
      }
      keep
    });
    plan.dropped.sort();

    for &(coord, priority) in &self.candidates {
      if !self.budget.can_generate(plan.admitted.len()) {
        break;
      }
      if let Some(tracked) = self.tracked.get_mut(&coord) {
        if tracked.phase == ChunkPhase::Pending {
          tracked.phase = ChunkPhase::Generating;
          plan.admitted.push((coord, priority));
        }
      }
    }

    if !plan.admitted.is_empty() || !plan.dropped.is_empty() {
      debug!(
        viewer = %viewer,
        admitted = plan.admitted.len(),
        dropped = plan.dropped.len(),
        pending = self.count_in(ChunkPhase::Pending),
        "scheduler update"
      );
    }
    plan
  }

  // ===========================================================================
  // Phase transitions driven by completions
  // ===========================================================================

  /// Generating → Ready. Returns false if the chunk was not generating.
  ///
  /// When the lattice replaces an invalidated one, Ready face neighbors are
  /// flagged for re-mesh since they sample its boundary.
  pub fn lattice_ready(&mut self, coord: ChunkCoord) -> bool {
    let invalidated = match self.tracked.get_mut(&coord) {
      Some(tracked) if tracked.phase == ChunkPhase::Generating => {
        tracked.phase = ChunkPhase::Ready;
        std::mem::take(&mut tracked.invalidated)
      }
      _ => return false,
    };
    if invalidated {
      for neighbor in coord.neighbors() {
        if let Some(tracked) = self.tracked.get_mut(&neighbor) {
          if tracked.phase == ChunkPhase::Ready {
            tracked.remesh = true;
          }
        }
      }
    }
    true
  }

  /// Clear the in-flight mark set by `plan_meshes` for `generation`.
  pub fn mesh_finished(&mut self, coord: ChunkCoord, generation: u64) {
    if let Some(tracked) = self.tracked.get_mut(&coord) {
      if tracked.mesh_in_flight == Some(generation) {
        tracked.mesh_in_flight = None;
      }
    }
  }

  /// Restart a tracked chunk at Pending (its store record was invalidated).
  pub fn requeue(&mut self, coord: ChunkCoord) -> bool {
    match self.tracked.get_mut(&coord) {
      Some(tracked) => {
        tracked.phase = ChunkPhase::Pending;
        tracked.mesh_in_flight = None;
        tracked.remesh = false;
        tracked.invalidated = true;
        true
      }
      None => false,
    }
  }

  /// Stop tracking `coord` (after eviction or a generation failure).
  pub fn forget(&mut self, coord: ChunkCoord) -> Option<ChunkPhase> {
    self.tracked.remove(&coord).map(|t| t.phase)
  }

  // ===========================================================================
  // Meshing and eviction
  // ===========================================================================

  /// Choose Ready chunks to mesh this tick, in priority order.
  pub fn plan_meshes(&mut self, store: &ChunkStore) -> Vec<MeshPlan> {
    let mut plans = Vec::new();
    for &(coord, priority) in &self.candidates {
      if !self.budget.can_mesh(plans.len()) {
        break;
      }
      let Some(tracked) = self.tracked.get(&coord) else {
        continue;
      };
      if tracked.phase != ChunkPhase::Ready || tracked.mesh_in_flight.is_some() {
        continue;
      }
      let Some(record) = store.get(coord) else {
        continue;
      };

      let available = neighbor_mask(coord, |n| store.lattice(n).is_some());
      let needs_mesh = match record.state {
        LifecycleState::LatticeReady => true,
        LifecycleState::MeshReady => tracked.remesh || available & !record.mesh_neighbors != 0,
        _ => false,
      };
      if !needs_mesh {
        continue;
      }

      let required = neighbor_mask(coord, |n| self.in_range(n));
      if required & !available != 0 && priority != PriorityClass::Immediate {
        trace!(chunk = %coord, "mesh deferred, waiting for neighbors");
        continue;
      }

      plans.push(MeshPlan {
        coord,
        priority,
        generation: record.generation,
      });
    }

    for plan in &plans {
      if let Some(tracked) = self.tracked.get_mut(&plan.coord) {
        tracked.mesh_in_flight = Some(plan.generation);
        tracked.remesh = false;
      }
    }
    plans
  }

  /// Mark chunks beyond `tracked_radius + hysteresis` whose store record has
  /// been idle for the grace period as Stale, and return them.
  pub fn select_evictions(&mut self, store: &ChunkStore, now: Instant) -> Vec<ChunkCoord> {
    let Some(viewer) = self.viewer else {
      return Vec::new();
    };
    let limit = self.tracked_radius().saturating_add(self.eviction.hysteresis);
    let grace = self.eviction.grace;

    let mut stale: Vec<ChunkCoord> = self
      .tracked
      .iter()
      .filter(|(_, t)| matches!(t.phase, ChunkPhase::Generating | ChunkPhase::Ready))
      .filter(|(coord, _)| viewer.manhattan_distance(**coord) > limit)
      .filter(|(coord, _)| {
        store
          .get(**coord)
          .map_or(true, |r| now.saturating_duration_since(r.last_access) >= grace)
      })
      .map(|(coord, _)| *coord)
      .collect();
    stale.sort();

    for coord in &stale {
      if let Some(tracked) = self.tracked.get_mut(coord) {
        tracked.phase = ChunkPhase::Stale;
      }
    }
    stale
  }

  /// Tracked chunks inside the candidate box that have a store record.
  pub fn live_in_range(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
    self
      .candidates
      .iter()
      .map(|&(coord, _)| coord)
      .filter(|coord| {
        self
          .tracked
          .get(coord)
          .is_some_and(|t| matches!(t.phase, ChunkPhase::Generating | ChunkPhase::Ready))
      })
  }
}

#[inline]
fn within_box(viewer: ChunkCoord, coord: ChunkCoord, h: u32, v: u32) -> bool {
  viewer.x.abs_diff(coord.x) <= h && viewer.z.abs_diff(coord.z) <= h && viewer.y.abs_diff(coord.y) <= v
}

/// Bit `face.index()` set for faces whose neighbor satisfies `pred`.
#[inline]
fn neighbor_mask(coord: ChunkCoord, mut pred: impl FnMut(ChunkCoord) -> bool) -> u8 {
  Face::ALL.iter().fold(0u8, |mask, &face| {
    if pred(coord.neighbor(face)) {
      mask | (1 << face.index())
    } else {
      mask
    }
  })
}
