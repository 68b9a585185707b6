//! Streaming statistics for the terrain engine.
//!
//! Feature-gated and runtime-toggled so that a build without `metrics`
//! records nothing.
//!
//! # Usage
//!
//! ```ignore
//! use voxel_terrain::metrics::COLLECT_METRICS;
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! let metrics = engine.metrics();
//! println!("avg mesh {:.0}us", metrics.avg_mesh_timing_us());
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::pool::PoolStats;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Metrics are collected only when compiled in and toggled on.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Fixed-capacity window over the most recent values.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Push a value, evicting the oldest at capacity.
  pub fn push(&mut self, value: T) {
    if self.capacity == 0 {
      return;
    }
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.buffer.iter().sum()
  }

  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Counters and timings updated by the engine as completions are applied.
#[derive(Debug, Clone, Default)]
pub struct StreamingMetrics {
  // Timing
  /// Worker time per lattice fill, microseconds.
  pub lattice_timings: RollingWindow<u64>,
  /// Worker time per mesh extraction, microseconds.
  pub mesh_timings: RollingWindow<u64>,
  pub last_lattice_us: u64,
  pub last_mesh_us: u64,

  // Totals (cumulative, survive `reset`)
  pub lattices_generated: u64,
  pub meshes_built: u64,
  pub chunks_evicted: u64,
  pub generation_failures: u64,
  pub stale_results: u64,
  pub triangles_emitted: u64,

  // Snapshot
  /// Pool statistics at the end of the last tick.
  pub pool: PoolStats,
}

impl StreamingMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear timing windows. Cumulative totals are kept.
  pub fn reset(&mut self) {
    self.lattice_timings.clear();
    self.mesh_timings.clear();
    self.last_lattice_us = 0;
    self.last_mesh_us = 0;
  }

  pub fn record_lattice(&mut self, timing_us: u64) {
    if is_enabled() {
      self.lattice_timings.push(timing_us);
      self.last_lattice_us = timing_us;
      self.lattices_generated += 1;
    }
  }

  pub fn record_mesh(&mut self, timing_us: u64, triangles: usize) {
    if is_enabled() {
      self.mesh_timings.push(timing_us);
      self.last_mesh_us = timing_us;
      self.meshes_built += 1;
      self.triangles_emitted += triangles as u64;
    }
  }

  pub fn record_eviction(&mut self) {
    if is_enabled() {
      self.chunks_evicted += 1;
    }
  }

  pub fn record_failure(&mut self) {
    if is_enabled() {
      self.generation_failures += 1;
    }
  }

  pub fn record_stale(&mut self) {
    if is_enabled() {
      self.stale_results += 1;
    }
  }

  pub fn record_pool(&mut self, stats: PoolStats) {
    if is_enabled() {
      self.pool = stats;
    }
  }

  pub fn avg_lattice_timing_us(&self) -> f64 {
    self.lattice_timings.average()
  }

  pub fn avg_mesh_timing_us(&self) -> f64 {
    self.mesh_timings.average()
  }

  /// Fraction of pool acquisitions served from retained buffers.
  pub fn pool_hit_rate(&self) -> f64 {
    let total = self.pool.hits + self.pool.misses;
    if total == 0 {
      0.0
    } else {
      self.pool.hits as f64 / total as f64
    }
  }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
  use super::*;

  #[test]
  fn test_rolling_window() {
    let mut window = RollingWindow::new(3);
    assert!(window.is_empty());

    window.push(10u64);
    window.push(20);
    window.push(30);
    assert_eq!(window.len(), 3);
    assert_eq!(window.sum(), 60);
    assert_eq!(window.average(), 20.0);

    // oldest falls out
    window.push(40);
    assert_eq!(window.len(), 3);
    assert_eq!(window.sum(), 90);
    assert_eq!(window.min_max(), Some((20, 40)));
    assert_eq!(window.last(), Some(&40));
  }

  #[test]
  fn test_zero_capacity_window() {
    let mut window = RollingWindow::<u64>::new(0);
    window.push(5);
    assert!(window.is_empty());
    assert_eq!(window.min_max(), None);
    assert_eq!(window.average(), 0.0);
  }

  #[test]
  fn test_streaming_counters() {
    let mut metrics = StreamingMetrics::new();
    metrics.record_lattice(100);
    metrics.record_lattice(300);
    metrics.record_mesh(50, 12);
    metrics.record_eviction();
    metrics.record_failure();
    metrics.record_stale();

    assert_eq!(metrics.lattices_generated, 2);
    assert_eq!(metrics.avg_lattice_timing_us(), 200.0);
    assert_eq!(metrics.last_mesh_us, 50);
    assert_eq!(metrics.triangles_emitted, 12);
    assert_eq!(metrics.chunks_evicted, 1);
    assert_eq!(metrics.generation_failures, 1);
    assert_eq!(metrics.stale_results, 1);

    metrics.reset();
    assert!(metrics.lattice_timings.is_empty());
    assert_eq!(metrics.lattices_generated, 2);
  }

  #[test]
  fn test_pool_hit_rate() {
    let mut metrics = StreamingMetrics::new();
    assert_eq!(metrics.pool_hit_rate(), 0.0);
    metrics.record_pool(PoolStats {
      hits: 3,
      misses: 1,
      ..PoolStats::default()
    });
    assert_eq!(metrics.pool_hit_rate(), 0.75);
  }
}
