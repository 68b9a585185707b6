//! TerrainConfig - static engine configuration with a single validation step.
//!
//! Loadable from TOML; every field has a default so partial files work:
//!
//! ```toml
//! chunk_edge_length = 16
//! vertical_chunk_edge_length = 16
//! surface_level = 0.0
//! seed = 1337
//! horizontal_radius = 4
//! vertical_radius = 2
//! max_generations_per_tick = 5
//!
//! [noise]
//! ground_level = 0.0
//! vertical_gradient = 1.0
//! layers = [
//!   { scale = 64.0, amplitude = 12.0 },
//!   { scale = 16.0, amplitude = 3.0 },
//! ]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::constants::*;
use crate::error::ConfigError;
use crate::geometry::{ChunkGeometry, OriginMapping};
use crate::types::LatticeDims;

/// One noise octave: `amplitude * noise(world / scale)`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct NoiseLayer {
  /// Feature size in world units (larger = broader features).
  pub scale: f64,
  /// Contribution of this layer to the density.
  pub amplitude: f64,
}

impl NoiseLayer {
  pub const fn new(scale: f64, amplitude: f64) -> Self {
    Self { scale, amplitude }
  }
}

/// Density field shape: vertical bias plus noise octaves.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
  /// World height where the vertical bias crosses zero.
  pub ground_level: f64,
  /// Density gained per world unit of height. Must be positive so the bias
  /// is monotonic (solid below, air above).
  pub vertical_gradient: f64,
  /// Octaves, coarse to fine.
  pub layers: Vec<NoiseLayer>,
}

impl Default for NoiseConfig {
  fn default() -> Self {
    Self {
      ground_level: 0.0,
      vertical_gradient: 1.0,
      layers: vec![
        NoiseLayer::new(64.0, 12.0), // coarse
        NoiseLayer::new(24.0, 4.0),  // medium
        NoiseLayer::new(8.0, 1.0),   // fine
      ],
    }
  }
}

impl NoiseConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    finite("noise.ground_level", self.ground_level)?;
    positive("noise.vertical_gradient", self.vertical_gradient)?;
    for (index, layer) in self.layers.iter().enumerate() {
      if !(layer.scale.is_finite() && layer.scale > 0.0) {
        return Err(ConfigError::InvalidLayerScale {
          index,
          scale: layer.scale,
        });
      }
      if !layer.amplitude.is_finite() {
        return Err(ConfigError::InvalidLayerAmplitude {
          index,
          amplitude: layer.amplitude,
        });
      }
    }
    Ok(())
  }
}

/// Static engine configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
  /// Cells per chunk along X and Z.
  pub chunk_edge_length: u32,
  /// Cells per chunk along Y.
  pub vertical_chunk_edge_length: u32,
  /// World units between adjacent samples.
  pub voxel_size: f64,
  /// Isosurface level; samples strictly below are inside.
  pub surface_level: f32,
  /// Interpolate vertices along edges (false = edge midpoints).
  pub interpolate: bool,
  pub seed: u32,
  pub noise: NoiseConfig,
  /// Chunk → world origin mapping.
  pub origin_mapping: OriginMapping,

  /// Streaming radius in chunks along X and Z.
  pub horizontal_radius: u32,
  /// Streaming radius in chunks along Y.
  pub vertical_radius: u32,
  /// New chunks admitted into generation per tick.
  pub max_generations_per_tick: usize,
  /// Mesh requests dispatched per tick.
  pub max_mesh_dispatches_per_tick: usize,
  /// Extra Manhattan distance beyond the tracked radius before eviction.
  pub eviction_hysteresis: u32,
  /// Minimum idle time before an out-of-range chunk is evicted.
  pub eviction_grace_ms: u64,

  /// Background worker threads.
  pub worker_count: usize,
  /// Buffers retained per pool shelf.
  pub pool_capacity: usize,
}

impl Default for TerrainConfig {
  fn default() -> Self {
    Self {
      chunk_edge_length: DEFAULT_CHUNK_EDGE,
      vertical_chunk_edge_length: DEFAULT_VERTICAL_CHUNK_EDGE,
      voxel_size: 1.0,
      surface_level: 0.0,
      interpolate: true,
      seed: 0,
      noise: NoiseConfig::default(),
      origin_mapping: OriginMapping::default(),
      horizontal_radius: DEFAULT_HORIZONTAL_RADIUS,
      vertical_radius: DEFAULT_VERTICAL_RADIUS,
      max_generations_per_tick: DEFAULT_GENERATIONS_PER_TICK,
      max_mesh_dispatches_per_tick: DEFAULT_MESH_DISPATCHES_PER_TICK,
      eviction_hysteresis: DEFAULT_EVICTION_HYSTERESIS,
      eviction_grace_ms: DEFAULT_EVICTION_GRACE_MS,
      worker_count: default_worker_count(),
      pool_capacity: DEFAULT_POOL_CAPACITY,
    }
  }
}

fn default_worker_count() -> usize {
  std::thread::available_parallelism()
    .map(|n| n.get().saturating_sub(1).max(1))
    .unwrap_or(2)
}

impl TerrainConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_chunk_edges(mut self, horizontal: u32, vertical: u32) -> Self {
    self.chunk_edge_length = horizontal;
    self.vertical_chunk_edge_length = vertical;
    self
  }

  pub fn with_voxel_size(mut self, size: f64) -> Self {
    self.voxel_size = size;
    self
  }

  pub fn with_surface_level(mut self, level: f32) -> Self {
    self.surface_level = level;
    self
  }

  pub fn with_interpolation(mut self, interpolate: bool) -> Self {
    self.interpolate = interpolate;
    self
  }

  pub fn with_seed(mut self, seed: u32) -> Self {
    self.seed = seed;
    self
  }

  pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
    self.noise = noise;
    self
  }

  pub fn with_origin_mapping(mut self, mapping: OriginMapping) -> Self {
    self.origin_mapping = mapping;
    self
  }

  pub fn with_radii(mut self, horizontal: u32, vertical: u32) -> Self {
    self.horizontal_radius = horizontal;
    self.vertical_radius = vertical;
    self
  }

  pub fn with_generation_budget(mut self, per_tick: usize) -> Self {
    self.max_generations_per_tick = per_tick;
    self
  }

  pub fn with_workers(mut self, count: usize) -> Self {
    self.worker_count = count;
    self
  }

  pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
    self.pool_capacity = capacity;
    self
  }

  pub fn with_eviction(mut self, hysteresis: u32, grace_ms: u64) -> Self {
    self.eviction_hysteresis = hysteresis;
    self.eviction_grace_ms = grace_ms;
    self
  }

  /// Reject invalid values. Called once when the engine is built.
  pub fn validate(&self) -> Result<(), ConfigError> {
    positive("chunk_edge_length", self.chunk_edge_length as f64)?;
    positive(
      "vertical_chunk_edge_length",
      self.vertical_chunk_edge_length as f64,
    )?;
    positive("voxel_size", self.voxel_size)?;
    finite("surface_level", self.surface_level as f64)?;
    positive(
      "max_generations_per_tick",
      self.max_generations_per_tick as f64,
    )?;
    positive(
      "max_mesh_dispatches_per_tick",
      self.max_mesh_dispatches_per_tick as f64,
    )?;
    positive("worker_count", self.worker_count as f64)?;
    at_most("horizontal_radius", self.horizontal_radius, MAX_RADIUS)?;
    at_most("vertical_radius", self.vertical_radius, MAX_RADIUS)?;
    at_most("eviction_hysteresis", self.eviction_hysteresis, MAX_RADIUS)?;
    self.noise.validate()
  }

  /// Parse TOML and validate.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let config: TerrainConfig =
      toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Load configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)
      .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    Self::from_toml_str(&content)
  }

  pub fn lattice_dims(&self) -> LatticeDims {
    LatticeDims::new(self.chunk_edge_length, self.vertical_chunk_edge_length)
  }

  pub fn geometry(&self) -> ChunkGeometry {
    ChunkGeometry::new(self.lattice_dims(), self.voxel_size, self.origin_mapping)
  }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
  finite(field, value)?;
  if value <= 0.0 {
    return Err(ConfigError::NonPositive { field, value });
  }
  Ok(())
}

fn at_most(field: &'static str, value: u32, max: u32) -> Result<(), ConfigError> {
  if value > max {
    return Err(ConfigError::OutOfRange {
      field,
      value: value as u64,
      max: max as u64,
    });
  }
  Ok(())
}

fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
  if !value.is_finite() {
    return Err(ConfigError::NonFinite { field, value });
  }
  Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
