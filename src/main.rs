use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use clap::Parser;
use log::{debug, error, info};
use minecraft_world::{
    config::WorldConfig,
    world::{gen::WorldGenerator, occlusion::OcclusionTable, sched::GenerationScheduler, Direction, World},
    ConfigError,
};
use serde_derive::Serialize;
use stopwatch::Stopwatch;

/// Generates a square of chunks and reports occlusion and AO statistics.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// World configuration (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Radius of the generated region, in chunks.
    #[arg(short, long, default_value_t = 4)]
    radius: i32,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize, Debug, Default)]
struct Summary {
    chunks: usize,
    sections: usize,
    opaque_blocks: usize,
    empty_tables: usize,
    full_tables: usize,
    traced_tables: usize,
    occlusion_version: u64,
    shaded_corners: usize,
    generation_ms: i64,
    analysis_ms: i64,
}

fn analyze(world: &World, summary: &mut Summary) {
    for chunk in world.chunks() {
        summary.chunks += 1;
        for section in chunk.sections() {
            summary.sections += 1;
            summary.opaque_blocks += section.opaque_count();

            match section.occlusion_table() {
                OcclusionTable::EMPTY => summary.empty_tables += 1,
                OcclusionTable::FULL => summary.full_tables += 1,
                _ => summary.traced_tables += 1,
            }

            summary.shaded_corners += section
                .face_ambient_occlusion(Direction::Up)
                .iter()
                .flatten()
                .filter(|&&level| level > 0)
                .count();
        }
    }
}

fn main() -> Result<(), ConfigError> {
    pretty_env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    debug!("Using {:?}", config.dimension);

    let world = Arc::new(World::new(config.dimension));
    let generator = Arc::new(WorldGenerator::new(config.generator.clone(), config.dimension));
    let scheduler = GenerationScheduler::new(world.clone(), generator);

    let mut summary = Summary::default();
    let stopwatch = Stopwatch::start_new();
    let workers = scheduler.start(config.scheduler.threads.max(1));
    scheduler.request_region(0, 0, args.radius.max(0));
    while scheduler.pending_count() > 0 {
        thread::sleep(Duration::from_millis(5));
    }
    summary.generation_ms = stopwatch.elapsed_ms();

    drop(scheduler);
    for worker in workers {
        if worker.join().is_err() {
            error!("A generation worker panicked");
        }
    }

    let stopwatch = Stopwatch::start_new();
    analyze(&world, &mut summary);
    summary.analysis_ms = stopwatch.elapsed_ms();
    summary.occlusion_version = world.occlusion_version();

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!(
            "Generated {} chunks ({} sections) in {}ms",
            summary.chunks, summary.sections, summary.generation_ms
        );
        println!("{:#?}", summary);
    }
    Ok(())
}
