//! Error taxonomy for the terrain engine.
//!
//! - `ConfigError`: invalid configuration, fatal at startup, never retried.
//! - `GenerationFailure`: a worker failed to produce a lattice or mesh. The
//!   chunk drops back to untracked and is retried on a later tick.
//! - Stale results are not errors; see `store::ApplyOutcome::Stale`.

use thiserror::Error;

/// Invalid configuration detected during validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  #[error("{field} must be positive, got {value}")]
  NonPositive { field: &'static str, value: f64 },

  #[error("{field} must be finite, got {value}")]
  NonFinite { field: &'static str, value: f64 },

  #[error("{field} must be at most {max}, got {value}")]
  OutOfRange {
    field: &'static str,
    value: u64,
    max: u64,
  },

  #[error("noise layer {index}: scale must be positive and finite, got {scale}")]
  InvalidLayerScale { index: usize, scale: f64 },

  #[error("noise layer {index}: amplitude must be finite, got {amplitude}")]
  InvalidLayerAmplitude { index: usize, amplitude: f64 },

  #[error("failed to parse configuration: {0}")]
  Parse(String),

  #[error("failed to read configuration: {0}")]
  Io(String),
}

/// A worker could not produce its result. Carries a textual cause only,
/// never a partial lattice or mesh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("chunk generation failed: {cause}")]
pub struct GenerationFailure {
  pub cause: String,
}

impl GenerationFailure {
  pub fn new(cause: impl Into<String>) -> Self {
    Self {
      cause: cause.into(),
    }
  }
}

impl From<ConfigError> for GenerationFailure {
  fn from(err: ConfigError) -> Self {
    Self::new(err.to_string())
  }
}

/// Malformed `"cx,cy,cz"` chunk key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkKeyError {
  #[error("chunk key must have 3 comma-separated components, got {0}")]
  ComponentCount(usize),

  #[error("chunk key component {component:?} is not an integer")]
  InvalidComponent { component: String },
}

/// Errors surfaced by engine construction.
#[derive(Debug, Error)]
pub enum TerrainError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("failed to build worker pool: {0}")]
  WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
