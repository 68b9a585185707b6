//! Per-tick work limits.
//!
//! Bounds how many chunks enter generation and how many mesh requests are
//! dispatched each tick, regardless of how many are notionally missing.

use std::time::Duration;

use crate::config::TerrainConfig;
use crate::constants::{DEFAULT_GENERATIONS_PER_TICK, DEFAULT_MESH_DISPATCHES_PER_TICK};

/// Work admitted per scheduling tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickBudget {
  /// New chunks moved from Pending to Generating.
  pub max_generations: usize,
  /// Mesh requests dispatched.
  pub max_mesh_dispatches: usize,
}

impl TickBudget {
  pub const DEFAULT: Self = Self {
    max_generations: DEFAULT_GENERATIONS_PER_TICK,
    max_mesh_dispatches: DEFAULT_MESH_DISPATCHES_PER_TICK,
  };

  /// Unlimited budget for testing or special cases.
  pub const UNLIMITED: Self = Self {
    max_generations: usize::MAX,
    max_mesh_dispatches: usize::MAX,
  };

  pub fn from_config(config: &TerrainConfig) -> Self {
    Self {
      max_generations: config.max_generations_per_tick,
      max_mesh_dispatches: config.max_mesh_dispatches_per_tick,
    }
  }

  #[inline]
  pub fn can_generate(&self, performed: usize) -> bool {
    performed < self.max_generations
  }

  #[inline]
  pub fn can_mesh(&self, performed: usize) -> bool {
    performed < self.max_mesh_dispatches
  }
}

impl Default for TickBudget {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// When out-of-range chunks are evicted.
///
/// Distance is Manhattan, measured against the box corner distance
/// `2 * horizontal_radius + vertical_radius`, so the candidate box itself is
/// never evicted. The cost is that chunks left behind along a single axis
/// stay resident out to that corner distance plus `hysteresis`, which is
/// 12 chunks with the default radii. Lower `hysteresis` or the radii to
/// bound residency more tightly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvictionPolicy {
  /// Extra Manhattan distance beyond the tracked radius.
  pub hysteresis: u32,
  /// Minimum time since last access.
  pub grace: Duration,
}

impl EvictionPolicy {
  pub fn from_config(config: &TerrainConfig) -> Self {
    Self {
      hysteresis: config.eviction_hysteresis,
      grace: Duration::from_millis(config.eviction_grace_ms),
    }
  }
}

impl Default for EvictionPolicy {
  fn default() -> Self {
    Self::from_config(&TerrainConfig::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_budget() {
    let budget = TickBudget::default();
    assert_eq!(budget.max_generations, 5);
    assert!(budget.can_generate(4));
    assert!(!budget.can_generate(5));
  }

  #[test]
  fn test_unlimited_budget() {
    let budget = TickBudget::UNLIMITED;
    assert!(budget.can_generate(1_000_000));
    assert!(budget.can_mesh(1_000_000));
  }

  #[test]
  fn test_from_config() {
    let config = TerrainConfig::new().with_generation_budget(2).with_eviction(3, 250);
    assert_eq!(TickBudget::from_config(&config).max_generations, 2);
    let eviction = EvictionPolicy::from_config(&config);
    assert_eq!(eviction.hysteresis, 3);
    assert_eq!(eviction.grace, Duration::from_millis(250));
  }
}
