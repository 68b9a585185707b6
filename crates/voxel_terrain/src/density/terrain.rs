//! LayeredDensity - vertical bias plus Perlin octaves.
//!
//! ```text
//!   density(p) = (p.y - ground_level) * vertical_gradient
//!              + Σ layer.amplitude * perlin_i(p / layer.scale)
//! ```
//!
//! Each layer gets its own Perlin permutation (`seed + layer index`) so
//! octaves do not line up. The bias dominates far from the ground, keeping
//! deep samples solid and high samples air.

use noise::{NoiseFn, Perlin};

use super::DensityField;
use crate::config::{NoiseConfig, NoiseLayer};
use crate::error::ConfigError;

struct Octave {
  perlin: Perlin,
  inv_scale: f64,
  amplitude: f64,
}

/// Terrain density built from a validated `NoiseConfig`.
pub struct LayeredDensity {
  ground_level: f64,
  vertical_gradient: f64,
  octaves: Vec<Octave>,
}

impl LayeredDensity {
  /// Build the field. Rejects invalid layer configuration.
  pub fn new(config: &NoiseConfig, seed: u32) -> Result<Self, ConfigError> {
    config.validate()?;
    let octaves = config
      .layers
      .iter()
      .enumerate()
      .map(|(i, &NoiseLayer { scale, amplitude })| Octave {
        perlin: Perlin::new(seed.wrapping_add(i as u32)),
        inv_scale: 1.0 / scale,
        amplitude,
      })
      .collect();
    Ok(Self {
      ground_level: config.ground_level,
      vertical_gradient: config.vertical_gradient,
      octaves,
    })
  }

  /// Largest total noise contribution, `Σ |amplitude|`.
  pub fn noise_amplitude(&self) -> f64 {
    self.octaves.iter().map(|o| o.amplitude.abs()).sum()
  }

  pub fn layer_count(&self) -> usize {
    self.octaves.len()
  }
}

impl DensityField for LayeredDensity {
  #[inline]
  fn sample(&self, x: f64, y: f64, z: f64) -> f32 {
    let mut density = (y - self.ground_level) * self.vertical_gradient;
    for octave in &self.octaves {
      let p = [x * octave.inv_scale, y * octave.inv_scale, z * octave.inv_scale];
      density += octave.amplitude * octave.perlin.get(p);
    }
    density as f32
  }
}

#[cfg(test)]
#[path = "terrain_test.rs"]
mod terrain_test;
