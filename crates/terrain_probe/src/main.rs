//! Headless streaming probe for voxel_terrain.
//!
//! Drives a `TerrainEngine` along a scripted viewer path, acting as the
//! renderer: keeps the latest mesh per chunk, drops evicted chunks, and
//! prints streaming statistics at the end.
//!
//! ```text
//! terrain_probe --config terrain.toml --path circle --ticks 1200
//! RUST_LOG=voxel_terrain=trace terrain_probe --path oscillate
//! ```

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use voxel_terrain::{ChunkCoord, MeshBuffer, TerrainEngine, TerrainUpdate};
use web_time::Instant;

use config::{PathKind, ProbeConfig};

/// Ticks spent draining outstanding work after the scripted path ends.
const MAX_DRAIN_TICKS: u32 = 5_000;

/// Headless terrain streaming probe.
#[derive(Parser, Debug)]
#[command(name = "terrain_probe")]
#[command(about = "Streams voxel terrain along a scripted viewer path and reports statistics")]
struct Args {
	/// Path to configuration TOML file (defaults apply when omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Override the number of scripted ticks.
	#[arg(short, long)]
	ticks: Option<u32>,

	/// Override the viewer path.
	#[arg(short, long, value_enum)]
	path: Option<PathKind>,

	/// Override the density seed.
	#[arg(short, long)]
	seed: Option<u32>,

	/// Do not sleep between ticks.
	#[arg(long)]
	no_sleep: bool,
}

/// Renderer stand-in: latest mesh per chunk plus running totals.
#[derive(Default)]
struct SceneTally {
	meshes: HashMap<ChunkCoord, Arc<MeshBuffer>>,
	ready_events: u64,
	evicted_events: u64,
	peak_chunks: usize,
}

impl SceneTally {
	/// Track the scene and hand replaced or dropped meshes back to the engine.
	fn apply(&mut self, engine: &TerrainEngine, update: TerrainUpdate) {
		self.ready_events += update.ready.len() as u64;
		self.evicted_events += update.evicted.len() as u64;
		for (coord, mesh) in update.ready {
			if let Some(old) = self.meshes.insert(coord, mesh) {
				engine.recycle_mesh(old);
			}
		}
		for coord in update.evicted {
			if let Some(old) = self.meshes.remove(&coord) {
				engine.recycle_mesh(old);
			}
		}
		self.peak_chunks = self.peak_chunks.max(self.meshes.len());
	}

	fn triangles(&self) -> usize {
		self.meshes.values().map(|m| m.triangle_count()).sum()
	}
}

fn main() -> Result<()> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::fmt::layer())
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			info!("Loading config from: {}", path.display());
			ProbeConfig::load(path)?
		}
		None => ProbeConfig::default(),
	};
	if let Some(ticks) = args.ticks {
		config.path.ticks = ticks;
	}
	if let Some(kind) = args.path {
		config.path.kind = kind;
	}
	if let Some(seed) = args.seed {
		config.terrain.seed = seed;
	}
	config.validate()?;

	let mut engine =
		TerrainEngine::new(config.terrain.clone()).context("Failed to start terrain engine")?;
	let sleep = if args.no_sleep {
		Duration::ZERO
	} else {
		Duration::from_millis(config.path.tick_ms)
	};

	info!(
		path = ?config.path.kind,
		ticks = config.path.ticks,
		workers = config.terrain.worker_count,
		"Streaming"
	);

	let started = Instant::now();
	let mut tally = SceneTally::default();

	for tick in 0..config.path.ticks {
		let viewer = config.path.position(tick);
		let update = engine.tick(viewer, Instant::now());
		tally.apply(&engine, update);
		if tick % 60 == 0 {
			info!(
				tick,
				viewer = ?engine.scheduler().viewer(),
				chunks = tally.meshes.len(),
				pending = engine.pending_work(),
				"progress"
			);
		}
		if !sleep.is_zero() {
			std::thread::sleep(sleep);
		}
	}

	let last = config.path.position(config.path.ticks.saturating_sub(1));
	let mut drained = 0;
	while !engine.is_settled() && drained < MAX_DRAIN_TICKS {
		let update = engine.tick(last, Instant::now());
		tally.apply(&engine, update);
		std::thread::sleep(Duration::from_millis(1));
		drained += 1;
	}
	if !engine.is_settled() {
		tracing::warn!(drained, "engine still busy after drain");
	}

	report(&engine, &tally, started.elapsed());
	Ok(())
}

fn report(engine: &TerrainEngine, tally: &SceneTally, elapsed: Duration) {
	let metrics = engine.metrics();
	let pool = engine.pool_stats();

	println!("\n=== terrain_probe ===");
	println!("elapsed            {:.2}s", elapsed.as_secs_f64());
	println!("chunks live        {}", tally.meshes.len());
	println!("chunks peak        {}", tally.peak_chunks);
	println!("triangles live     {}", tally.triangles());
	println!("ready events       {}", tally.ready_events);
	println!("evicted events     {}", tally.evicted_events);
	println!("lattices generated {}", metrics.lattices_generated);
	println!("meshes built       {}", metrics.meshes_built);
	println!("stale results      {}", metrics.stale_results);
	println!("failures           {}", metrics.generation_failures);
	println!(
		"lattice time       avg {:.0}us, last {}us",
		metrics.avg_lattice_timing_us(),
		metrics.last_lattice_us
	);
	println!(
		"mesh time          avg {:.0}us, last {}us",
		metrics.avg_mesh_timing_us(),
		metrics.last_mesh_us
	);
	println!(
		"pool               hits {} / misses {} ({:.0}%), dropped {}, retained {} lattices + {} meshes",
		pool.hits,
		pool.misses,
		metrics.pool_hit_rate() * 100.0,
		pool.dropped,
		pool.retained_lattices,
		pool.retained_meshes
	);
}
