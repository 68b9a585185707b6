//! voxel_terrain - chunked density-field terrain, engine independent
//!
//! Generates terrain as a grid of fixed-size chunks around a moving viewer.
//! Each chunk samples a scalar density field on an `(N+1)³` lattice and is
//! meshed with marching cubes, reading neighbor lattices at its faces so
//! adjacent chunks meet without seams.
//!
//! # Features
//!
//! - **Layered noise density**: vertical bias plus Perlin octaves, sampled
//!   from absolute world positions so shared boundary samples agree exactly
//! - **Marching cubes**: 256-case tables, interpolated or midpoint vertices,
//!   NaN/inf tolerant, flat normals over the unshared triangle soup
//! - **Priority streaming**: distance classes, per-tick generation budget,
//!   neighbor-gated meshing, hysteresis eviction
//! - **Background workers**: fixed rayon pool behind a priority queue, with
//!   bounded buffer pooling and generation tokens for stale results
//!
//! # Example
//!
//! ```ignore
//! use voxel_terrain::{TerrainConfig, TerrainEngine};
//!
//! let mut engine = TerrainEngine::new(TerrainConfig::default())?;
//!
//! // Each host frame:
//! let update = engine.tick(camera_position, web_time::Instant::now());
//! for (coord, mesh) in &update.ready {
//!     upload(coord, mesh);
//! }
//! for coord in &update.evicted {
//!     remove(coord);
//! }
//! ```

pub mod config;
pub mod constants;
pub mod edge_table;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::{NoiseConfig, NoiseLayer, TerrainConfig};
pub use error::{ChunkKeyError, ConfigError, GenerationFailure, TerrainError};
pub use geometry::{ChunkGeometry, OriginMapping};
pub use types::{ChunkCoord, DensityLattice, Face, LatticeDims, MeshBuffer};

// Density fields and lattice sampling
pub mod density;
pub use density::{fill_lattice, DensityField, LayeredDensity};

// Marching cubes extraction
pub mod mesher;
pub use mesher::{extract, extract_into, extract_pooled, MeshSettings, NeighborSet};

// Buffer recycling shared with workers
pub mod pool;
pub use pool::{BufferPool, PoolStats};

// Chunk records and lifecycle
pub mod store;
pub use store::{ApplyOutcome, ChunkRecord, ChunkStore, LifecycleState};

// Candidate selection, priorities, eviction
pub mod scheduler;
pub use scheduler::{PriorityClass, StreamingScheduler};

// Background workers
pub mod dispatch;
pub use dispatch::{RequestKind, WorkRequest, WorkResponse, WorkerDispatch};

// Coordinating context
pub mod engine;
pub use engine::{TerrainEngine, TerrainUpdate};

// Engine-agnostic metrics
pub mod metrics;
pub use metrics::StreamingMetrics;

#[cfg(test)]
mod test_utils;
