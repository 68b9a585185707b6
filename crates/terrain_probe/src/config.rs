//! Probe configuration: engine settings plus a scripted viewer path.

use anyhow::{Context, Result};
use clap::ValueEnum;
use glam::DVec3;
use serde::Deserialize;
use std::path::Path;
use voxel_terrain::TerrainConfig;

/// Root configuration for a probe run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
	/// Engine configuration, validated on load.
	pub terrain: TerrainConfig,
	/// Viewer path driven through the engine.
	pub path: PathConfig,
}

/// Shape of the scripted viewer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
	/// Fly along +X.
	Straight,
	/// Orbit the origin at `radius`.
	Circle,
	/// Swing back and forth along X across the origin (hysteresis check).
	Oscillate,
	/// Stand still at the origin.
	Hover,
}

/// Scripted viewer movement.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathConfig {
	pub kind: PathKind,
	/// World units per tick (radians per tick scaled by radius for circles).
	pub speed: f64,
	/// Circle radius or oscillation amplitude in world units.
	pub radius: f64,
	/// Viewer height.
	pub height: f64,
	/// Ticks to drive before draining outstanding work.
	pub ticks: u32,
	/// Sleep between ticks in milliseconds.
	pub tick_ms: u64,
}

impl Default for PathConfig {
	fn default() -> Self {
		Self {
			kind: PathKind::Straight,
			speed: 1.0,
			radius: 48.0,
			height: 8.0,
			ticks: 600,
			tick_ms: 16,
		}
	}
}

impl PathConfig {
	/// Viewer world position at `tick`.
	pub fn position(&self, tick: u32) -> DVec3 {
		let t = tick as f64;
		match self.kind {
			PathKind::Straight => DVec3::new(t * self.speed, self.height, 0.0),
			PathKind::Circle => {
				let angle = if self.radius > 0.0 { t * self.speed / self.radius } else { 0.0 };
				DVec3::new(
					self.radius * angle.cos(),
					self.height,
					self.radius * angle.sin(),
				)
			}
			PathKind::Oscillate => {
				let angle = if self.radius > 0.0 { t * self.speed / self.radius } else { 0.0 };
				DVec3::new(self.radius * angle.sin(), self.height, 0.0)
			}
			PathKind::Hover => DVec3::new(0.0, self.height, 0.0),
		}
	}
}

impl ProbeConfig {
	/// Load and validate a probe configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config: ProbeConfig =
			toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		self.terrain
			.validate()
			.context("Invalid [terrain] section")?;
		if !(self.path.speed.is_finite() && self.path.radius.is_finite() && self.path.height.is_finite()) {
			anyhow::bail!("path speed, radius and height must be finite");
		}
		Ok(())
	}
}
